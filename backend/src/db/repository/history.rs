//! History repository trait for per-location season outcomes.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{BloomDetection, HistoricalRecord, LocationKey};

/// Repository trait for bloom season history.
///
/// A location's record is created on its first write. Writes for an existing
/// (location, year) pair replace the stored outcome.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Store the outcome of `year` for `location`.
    ///
    /// # Returns
    /// * `Ok(true)` - An earlier outcome for that year was replaced
    /// * `Ok(false)` - The year was new
    /// * `Err(RepositoryError)` - If the operation fails
    async fn upsert_season(
        &self,
        location: LocationKey,
        year: i32,
        outcome: BloomDetection,
    ) -> RepositoryResult<bool>;

    /// Fetch the full record for a location, if any season was stored.
    async fn fetch_record(&self, location: LocationKey)
        -> RepositoryResult<Option<HistoricalRecord>>;

    async fn has_season(&self, location: LocationKey, year: i32) -> RepositoryResult<bool>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;
}
