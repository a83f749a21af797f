//! Deterministic synthetic observations.
//!
//! Produces an 8-day composite series following a Gaussian seasonal curve
//! whose peak shifts with latitude and, by a few days, from year to year.
//! Noise and cloud cover are derived from a hash of (location, date) so the
//! same query always returns the same samples.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use sha2::{Digest, Sha256};

use super::{ObservationProvider, ProviderResult};
use crate::models::{day_of_year, DateRange, GeoPoint, Observation, QualityFlag};

const COMPOSITE_DAYS: i64 = 8;
const BASE_NDVI: f64 = 0.3;
const SEASONAL_AMPLITUDE: f64 = 0.4;
const SEASON_WIDTH_DAYS: f64 = 30.0;
const NOISE_AMPLITUDE: f64 = 0.05;
const YEAR_JITTER_DAYS: f64 = 6.0;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    cloud_fraction: f64,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self {
            cloud_fraction: 0.1,
        }
    }

    /// Fraction of samples flagged as cloud, in [0, 1].
    pub fn with_cloud_fraction(mut self, fraction: f64) -> Self {
        self.cloud_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Day of year the seasonal curve peaks at for `point` in `year`.
    pub fn peak_day(point: GeoPoint, year: i32) -> f64 {
        let base = 100.0 + (point.lat / 90.0 * 30.0).trunc();
        let jitter = (unit_hash(&format!("{:.4}:{:.4}:{}", point.lat, point.lon, year)) - 0.5)
            * 2.0
            * YEAR_JITTER_DAYS;
        base + jitter.round()
    }

    /// Native NDVI for `date` before noise and clouds.
    pub fn seasonal_ndvi(point: GeoPoint, date: NaiveDate) -> f64 {
        let peak = Self::peak_day(point, date.year());
        let offset = day_of_year(date) as f64 - peak;
        BASE_NDVI
            + SEASONAL_AMPLITUDE * (-(offset * offset) / (2.0 * SEASON_WIDTH_DAYS.powi(2))).exp()
    }

    fn observation(&self, point: GeoPoint, date: NaiveDate) -> Observation {
        let seed = format!("{:.4}:{:.4}:{}", point.lat, point.lon, date);
        if unit_hash(&format!("cloud:{}", seed)) < self.cloud_fraction {
            return Observation::cloud(date);
        }
        let noise = (unit_hash(&seed) - 0.5) * 2.0 * NOISE_AMPLITUDE;
        let ndvi = (Self::seasonal_ndvi(point, date) + noise).clamp(0.0, 1.0);
        Observation::new(date, Some(ndvi), Some(ndvi * 0.8), QualityFlag::Valid)
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a string to [0, 1) through SHA-256.
fn unit_hash(input: &str) -> f64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
}

#[async_trait]
impl ObservationProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, point: GeoPoint, range: DateRange) -> ProviderResult<Vec<Observation>> {
        let steps = range.span_days() / COMPOSITE_DAYS;
        Ok((0..=steps)
            .map(|k| self.observation(point, range.start + Duration::days(k * COMPOSITE_DAYS)))
            .collect())
    }
}
