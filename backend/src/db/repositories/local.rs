//! In-memory history repository.
//!
//! One `RwLock` guards the whole store, so writes are serialized while reads
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{
    ErrorContext, HistoryRepository, RepositoryError, RepositoryResult,
};
use crate::models::{BloomDetection, HistoricalRecord, LocationKey};

/// Oldest and newest seasons the store accepts.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2200;

pub struct LocalHistoryRepository {
    records: RwLock<HashMap<LocationKey, HistoricalRecord>>,
    healthy: AtomicBool,
}

impl LocalHistoryRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            healthy: AtomicBool::new(true),
        }
    }

    /// Simulate the store going away (`false`) or coming back (`true`).
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    fn ensure_healthy(&self, operation: &str) -> RepositoryResult<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::connection(
                "history store unavailable",
                ErrorContext::new(operation),
            ))
        }
    }
}

impl Default for LocalHistoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryRepository for LocalHistoryRepository {
    async fn upsert_season(
        &self,
        location: LocationKey,
        year: i32,
        outcome: BloomDetection,
    ) -> RepositoryResult<bool> {
        self.ensure_healthy("upsert_season")?;
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(RepositoryError::validation(
                format!("season year outside {}..={}", MIN_YEAR, MAX_YEAR),
                ErrorContext::new("upsert_season")
                    .with_entity("season")
                    .with_entity_id(year),
            ));
        }

        let mut records = self.records.write();
        let replaced = records
            .entry(location)
            .or_insert_with(|| HistoricalRecord::new(location))
            .record(year, outcome)
            .is_some();

        log::debug!(
            "Stored season {} for {} ({})",
            year,
            location,
            if replaced { "replaced" } else { "new" }
        );
        Ok(replaced)
    }

    async fn fetch_record(
        &self,
        location: LocationKey,
    ) -> RepositoryResult<Option<HistoricalRecord>> {
        self.ensure_healthy("fetch_record")?;
        Ok(self.records.read().get(&location).cloned())
    }

    async fn has_season(&self, location: LocationKey, year: i32) -> RepositoryResult<bool> {
        self.ensure_healthy("has_season")?;
        Ok(self
            .records
            .read()
            .get(&location)
            .map(|r| r.get(year).is_some())
            .unwrap_or(false))
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }
}
