//! Observation provider boundary.
//!
//! The engine only ever talks to an [`ObservationProvider`]. Providers may
//! return samples out of order, with gaps or duplicates; the normalizer
//! copes with all of that.
//!
//! Implementations:
//! - [`LocalProvider`]: in-memory fixtures for tests and offline runs
//! - [`SyntheticProvider`]: deterministic seasonal curves (the default)
//! - `PowerProvider`: NASA POWER weather with weather-derived NDVI
//!   (behind the `nasa-power` feature)

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PhenologyError, PhenologyResult};
use crate::models::{DateRange, GeoPoint, Observation};

pub mod local;
#[cfg(feature = "nasa-power")]
pub mod power;
pub mod synthetic;

pub use local::LocalProvider;
#[cfg(feature = "nasa-power")]
pub use power::PowerProvider;
pub use synthetic::SyntheticProvider;

/// Environment variable selecting the provider for the server.
pub const PROVIDER_ENV_VAR: &str = "OBSERVATION_PROVIDER";

/// Errors a provider can report.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Source of raw vegetation index observations.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance serves every request.
#[async_trait]
pub trait ObservationProvider: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Fetch every observation for `point` within `range`.
    async fn fetch(&self, point: GeoPoint, range: DateRange) -> ProviderResult<Vec<Observation>>;
}

/// Fetch with a deadline, mapping any failure to `ProviderUnavailable`.
pub async fn fetch_with_timeout(
    provider: &dyn ObservationProvider,
    point: GeoPoint,
    range: DateRange,
    timeout: Duration,
) -> PhenologyResult<Vec<Observation>> {
    let result = match tokio::time::timeout(timeout, provider.fetch(point, range)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    };

    match result {
        Ok(observations) => {
            log::debug!(
                "Provider '{}' returned {} observations for ({:.4}, {:.4}) {}..{}",
                provider.name(),
                observations.len(),
                point.lat,
                point.lon,
                range.start,
                range.end
            );
            Ok(observations)
        }
        Err(e) => {
            log::warn!("Provider '{}' failed: {}", provider.name(), e);
            Err(PhenologyError::provider_unavailable(provider.name(), e.to_string()))
        }
    }
}

/// Provider implementations selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Local,
    Synthetic,
    NasaPower,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "synthetic" | "mock" => Ok(Self::Synthetic),
            "nasa-power" | "power" => Ok(Self::NasaPower),
            _ => Err(format!("Unknown observation provider: {}", s)),
        }
    }
}

impl ProviderKind {
    /// Read `OBSERVATION_PROVIDER`, defaulting to the synthetic provider.
    pub fn from_env() -> Result<Self, String> {
        match std::env::var(PROVIDER_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => value.trim().parse(),
            _ => Ok(Self::Synthetic),
        }
    }
}

/// Build a provider instance.
pub fn create_provider(kind: ProviderKind) -> PhenologyResult<Arc<dyn ObservationProvider>> {
    match kind {
        ProviderKind::Local => Ok(Arc::new(LocalProvider::new())),
        ProviderKind::Synthetic => Ok(Arc::new(SyntheticProvider::new())),
        #[cfg(feature = "nasa-power")]
        ProviderKind::NasaPower => Ok(Arc::new(PowerProvider::new()?)),
        #[cfg(not(feature = "nasa-power"))]
        ProviderKind::NasaPower => Err(PhenologyError::configuration(
            "NASA POWER provider requires the 'nasa-power' feature",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point() -> GeoPoint {
        GeoPoint::new(38.9, -77.0).unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("local".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert_eq!("Synthetic".parse::<ProviderKind>().unwrap(), ProviderKind::Synthetic);
        assert_eq!("nasa-power".parse::<ProviderKind>().unwrap(), ProviderKind::NasaPower);
        assert!("modis".parse::<ProviderKind>().is_err());
    }

    #[tokio::test]
    async fn test_unhealthy_provider_maps_to_unavailable() {
        let provider = LocalProvider::new();
        provider.set_healthy(false);

        let err = fetch_with_timeout(&provider, point(), range(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PhenologyError::ProviderUnavailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let provider = LocalProvider::new().with_latency(Duration::from_secs(60));

        let err = fetch_with_timeout(&provider, point(), range(), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            PhenologyError::ProviderUnavailable { provider, message } => {
                assert_eq!(provider, "local");
                assert!(message.contains("timed out"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
