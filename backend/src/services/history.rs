//! Historical aggregation of per-location bloom seasons.
//!
//! Onsets are summarized as days of year on the annual circle, so seasons
//! straddling the new year average correctly.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Serialize;

use crate::algorithms::circular_summary;
use crate::config::AggregatorConfig;
use crate::db::HistoryRepository;
use crate::error::{LowConfidence, PhenologyResult};
use crate::models::{day_of_year, BloomDetection, HistoricalRecord, LocationKey};

/// Cross-year summary of a location's seasons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStatistics {
    /// Circular mean onset day of year, when any season had a bloom
    pub mean_onset_doy: Option<f64>,
    /// Circular standard deviation in days, with two or more onsets
    pub stddev_onset_doy: Option<f64>,
    /// Mean onset-to-decline span over events with a known decline
    pub mean_duration_days: Option<f64>,
    /// Seasons recorded, with or without a bloom
    pub years_with_data: usize,
    pub years_with_bloom: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_confidence: Option<LowConfidence>,
}

impl HistoryStatistics {
    pub fn is_low_confidence(&self) -> bool {
        self.low_confidence.is_some()
    }
}

/// Summarize season outcomes.
///
/// Seasons without a bloom count towards `years_with_data` only.
pub fn compute_statistics<'a>(
    seasons: impl IntoIterator<Item = (&'a i32, &'a BloomDetection)>,
    min_years: usize,
) -> HistoryStatistics {
    let mut years_with_data = 0;
    let mut onsets = Vec::new();
    let mut durations = Vec::new();

    for (_, outcome) in seasons {
        years_with_data += 1;
        if let Some(event) = outcome.event() {
            onsets.push(day_of_year(event.onset_date) as f64);
            if let Some(days) = event.duration_days() {
                durations.push(days as f64);
            }
        }
    }

    let summary = circular_summary(&onsets);
    let mean_duration_days =
        (!durations.is_empty()).then(|| durations.iter().sum::<f64>() / durations.len() as f64);

    let low_confidence = if years_with_data < min_years {
        Some(LowConfidence::new(
            years_with_data,
            format!("fewer than {} seasons recorded", min_years),
        ))
    } else if onsets.len() < 2 {
        Some(LowConfidence::new(
            years_with_data,
            "fewer than 2 seasons with a detected onset",
        ))
    } else {
        None
    };

    HistoryStatistics {
        mean_onset_doy: summary.map(|s| s.mean_doy),
        stddev_onset_doy: summary.and_then(|s| s.stddev_days),
        mean_duration_days,
        years_with_data,
        years_with_bloom: onsets.len(),
        low_confidence,
    }
}

/// Records season outcomes and derives cross-year statistics.
pub struct HistoricalAggregator {
    repository: Arc<dyn HistoryRepository>,
    config: AggregatorConfig,
}

impl HistoricalAggregator {
    pub fn new(repository: Arc<dyn HistoryRepository>, config: AggregatorConfig) -> Self {
        Self { repository, config }
    }

    /// Store the outcome for (location, year), replacing any earlier one.
    ///
    /// Returns whether an earlier outcome was replaced.
    pub async fn record_event(
        &self,
        location: LocationKey,
        year: i32,
        outcome: BloomDetection,
    ) -> PhenologyResult<bool> {
        let replaced = self
            .repository
            .upsert_season(location, year, outcome)
            .await?;
        Ok(replaced)
    }

    pub async fn has_season(&self, location: LocationKey, year: i32) -> PhenologyResult<bool> {
        Ok(self.repository.has_season(location, year).await?)
    }

    /// Full record for a location; empty when nothing was stored yet.
    pub async fn history(&self, location: LocationKey) -> PhenologyResult<HistoricalRecord> {
        Ok(self
            .repository
            .fetch_record(location)
            .await?
            .unwrap_or_else(|| HistoricalRecord::new(location)))
    }

    /// Statistics over all stored seasons, or only over `years` when given.
    pub async fn statistics(
        &self,
        location: LocationKey,
        years: Option<RangeInclusive<i32>>,
    ) -> PhenologyResult<HistoryStatistics> {
        let record = self.history(location).await?;
        let stats = match years {
            Some(range) => compute_statistics(record.seasons_between(range), self.config.min_years),
            None => compute_statistics(&record.seasons, self.config.min_years),
        };

        if let Some(flag) = &stats.low_confidence {
            log::debug!("History for {}: {}", location, flag);
        }
        Ok(stats)
    }

    pub async fn is_healthy(&self) -> bool {
        self.repository.health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod history_tests;
