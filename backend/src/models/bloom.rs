//! Bloom events, detection outcomes and per-location season history.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::observation::{IndexKind, LocationKey};

/// A detected flowering event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloomEvent {
    /// Stable identifier, assigned once the event is tied to a location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub onset_date: NaiveDate,
    pub peak_date: NaiveDate,
    /// Absent while the decline has not been observed yet
    pub decline_date: Option<NaiveDate>,
    /// Unit-scale value at the peak
    pub peak_value: f64,
    /// Unit-scale baseline the event rose from
    pub baseline: f64,
    /// Weighted confidence in [0, 1]
    pub confidence: f64,
}

impl BloomEvent {
    /// Attach the identifier derived from location, onset and index.
    pub fn with_location(mut self, location: &LocationKey, index: IndexKind) -> Self {
        self.event_id = Some(event_id(location, self.onset_date, index));
        self
    }

    /// Days from onset to peak.
    pub fn rise_days(&self) -> i64 {
        (self.peak_date - self.onset_date).num_days()
    }

    /// Days from onset to decline, when the decline is known.
    pub fn duration_days(&self) -> Option<i64> {
        self.decline_date.map(|d| (d - self.onset_date).num_days())
    }
}

/// Derive a 16-hex-digit event identifier.
pub fn event_id(location: &LocationKey, onset: NaiveDate, index: IndexKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}_{}", location, onset, index).as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Why a detection pass found no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoBloomReason {
    /// No sample ever exceeded baseline + onset threshold
    NoRiseAboveBaseline,
    /// The series had no samples at all
    EmptySeries,
}

impl NoBloomReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoBloomReason::NoRiseAboveBaseline => "no_rise_above_baseline",
            NoBloomReason::EmptySeries => "empty_series",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            NoBloomReason::NoRiseAboveBaseline => {
                "No significant bloom event detected in this period"
            }
            NoBloomReason::EmptySeries => "No samples available for detection",
        }
    }
}

/// Outcome of one detection pass. "No event" is an explicit, successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BloomDetection {
    Detected(BloomEvent),
    NotDetected { reason: NoBloomReason },
}

impl BloomDetection {
    pub fn is_detected(&self) -> bool {
        matches!(self, BloomDetection::Detected(_))
    }

    pub fn event(&self) -> Option<&BloomEvent> {
        match self {
            BloomDetection::Detected(event) => Some(event),
            BloomDetection::NotDetected { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<NoBloomReason> {
        match self {
            BloomDetection::Detected(_) => None,
            BloomDetection::NotDetected { reason } => Some(*reason),
        }
    }
}

/// Season outcomes for one location, keyed by year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    pub location: LocationKey,
    pub seasons: BTreeMap<i32, BloomDetection>,
}

impl HistoricalRecord {
    pub fn new(location: LocationKey) -> Self {
        Self {
            location,
            seasons: BTreeMap::new(),
        }
    }

    /// Store the outcome for `year`, replacing any earlier outcome for it.
    pub fn record(&mut self, year: i32, outcome: BloomDetection) -> Option<BloomDetection> {
        self.seasons.insert(year, outcome)
    }

    pub fn get(&self, year: i32) -> Option<&BloomDetection> {
        self.seasons.get(&year)
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.seasons.keys().copied()
    }

    pub fn seasons_between(
        &self,
        years: RangeInclusive<i32>,
    ) -> impl Iterator<Item = (&i32, &BloomDetection)> {
        self.seasons.range(years)
    }
}
