//! In-memory observation provider.
//!
//! Serves fixtures registered with [`LocalProvider::insert`]. Used by tests
//! and for offline runs; it can also simulate latency and outages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ObservationProvider, ProviderError, ProviderResult};
use crate::models::{DateRange, GeoPoint, LocationKey, Observation};

/// Coordinate precision fixtures are keyed by.
const FIXTURE_PRECISION: u8 = 2;

pub struct LocalProvider {
    observations: RwLock<HashMap<LocationKey, Vec<Observation>>>,
    latency: Option<Duration>,
    healthy: AtomicBool,
    fetch_count: AtomicUsize,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self {
            observations: RwLock::new(HashMap::new()),
            latency: None,
            healthy: AtomicBool::new(true),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append observations for the point nearest (lat, lon).
    pub fn insert(&self, lat: f64, lon: f64, observations: impl IntoIterator<Item = Observation>) {
        let key = LocationKey::new(lat, lon, FIXTURE_PRECISION);
        self.observations
            .write()
            .entry(key)
            .or_default()
            .extend(observations);
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of fetches served or attempted so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObservationProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, point: GeoPoint, range: DateRange) -> ProviderResult<Vec<Observation>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable(
                "local provider marked unhealthy".to_string(),
            ));
        }

        let key = point.key(FIXTURE_PRECISION);
        let observations = self.observations.read();
        Ok(observations
            .get(&key)
            .map(|obs| {
                obs.iter()
                    .filter(|o| range.contains(o.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
