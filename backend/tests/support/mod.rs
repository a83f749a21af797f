#![allow(dead_code)]

//! Shared fixtures for the integration tests.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{Duration, NaiveDate};

use bloomwatch::models::{BloomDetection, BloomEvent, Observation};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables set (`Some`) or removed (`None`).
///
/// Access is serialized across tests and the previous values are restored
/// afterwards, even if `f` panics.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _restore = EnvRestore::apply(changes);
    f()
}

struct EnvRestore {
    previous: Vec<(String, Option<String>)>,
}

impl EnvRestore {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let previous = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect();

        for (key, value) in changes {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        Self { previous }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Native NDVI outside the bloom bump.
pub const BACKGROUND_NDVI: f64 = 0.1;

/// One observation every 8 days from Jan 1, flat at [`BACKGROUND_NDVI`]
/// except a three-sample bump (0.5, 0.8, 0.5) centred on grid index `peak`.
///
/// With the default engine configuration the detected onset is sample
/// `peak - 1`, i.e. day of year `8 * (peak - 1) + 1`.
pub fn bloom_year(year: i32, peak: usize) -> Vec<Observation> {
    let start = date(year, 1, 1);
    (0..46)
        .map(|k| {
            let ndvi = match k as i64 - peak as i64 {
                0 => 0.8,
                -1 | 1 => 0.5,
                _ => BACKGROUND_NDVI,
            };
            Observation::valid_ndvi(start + Duration::days(8 * k as i64), ndvi)
        })
        .collect()
}

/// A year with no bloom at all.
pub fn flat_year(year: i32) -> Vec<Observation> {
    let start = date(year, 1, 1);
    (0..46)
        .map(|k| Observation::valid_ndvi(start + Duration::days(8 * k), BACKGROUND_NDVI))
        .collect()
}

pub fn detected(onset: NaiveDate) -> BloomDetection {
    BloomDetection::Detected(BloomEvent {
        event_id: None,
        onset_date: onset,
        peak_date: onset + Duration::days(16),
        decline_date: Some(onset + Duration::days(40)),
        peak_value: 0.85,
        baseline: 0.55,
        confidence: 0.9,
    })
}
