//! Bloom predictions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Coarse confidence in a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::Low => "low",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::High => "high",
        }
    }
}

/// What the predicted date was anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionBasis {
    /// Circular mean onset of past seasons
    Historical,
    /// Onset already detected in the current partial season
    ObservedOnset,
    /// Latitude-based default day when no season showed an onset
    Climatology,
}

/// Predicted bloom onset with its confidence window.
///
/// Recomputed per query; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_date: NaiveDate,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
    pub confidence_label: ConfidenceLabel,
    pub basis: PredictionBasis,
    /// Seasons of history (with or without a bloom) behind the estimate
    pub years_used: usize,
    /// Spread used for the window, in days
    pub variability_days: f64,
}

impl Prediction {
    /// Half width of the window in days.
    pub fn half_window_days(&self) -> i64 {
        (self.latest_date - self.predicted_date).num_days()
    }
}
