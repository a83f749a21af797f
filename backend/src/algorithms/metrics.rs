//! Seasonal phenology metrics: green-up, peak, senescence and stage labels.
//!
//! Works in native index units so thresholds read like the NDVI values
//! agronomists quote.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{MetricsConfig, StageThresholds};
use crate::models::{to_native_scale, NormalizedSeries};

/// Coarse growth stage for a single native index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhenologyStage {
    Dormant,
    EarlyGreenup,
    Greenup,
    PeakGreen,
    Blooming,
    Mature,
}

impl PhenologyStage {
    pub fn from_native(value: f64, cuts: &StageThresholds) -> Self {
        if value < cuts.early_greenup {
            Self::Dormant
        } else if value < cuts.greenup {
            Self::EarlyGreenup
        } else if value < cuts.peak_green {
            Self::Greenup
        } else if value < cuts.blooming {
            Self::PeakGreen
        } else if value < cuts.mature {
            Self::Blooming
        } else {
            Self::Mature
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSample {
    pub date: NaiveDate,
    /// Native index value
    pub value: f64,
    pub stage: PhenologyStage,
}

/// Start, peak and end of the growing season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonMetrics {
    /// First sample at or above the season threshold
    pub greenup_date: Option<NaiveDate>,
    pub peak_date: NaiveDate,
    /// Native index value at the peak
    pub peak_value: f64,
    /// First sample after the peak that falls below the threshold
    pub senescence_date: Option<NaiveDate>,
    pub season_length_days: Option<i64>,
    pub stages: Vec<StageSample>,
}

/// Compute season metrics; all thresholds in `config` are native units.
/// `None` for an empty series.
pub fn season_metrics(series: &NormalizedSeries, config: &MetricsConfig) -> Option<SeasonMetrics> {
    let threshold = config.season_threshold;
    let samples: Vec<(NaiveDate, f64)> = series
        .points
        .iter()
        .map(|p| (p.date, to_native_scale(p.value)))
        .collect();

    let (peak_idx, &(peak_date, peak_value)) = samples
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.1.total_cmp(&b.1))?;

    let greenup_date = samples
        .iter()
        .find(|(_, v)| *v >= threshold)
        .map(|(d, _)| *d);
    let senescence_date = samples[peak_idx + 1..]
        .iter()
        .find(|(_, v)| *v < threshold)
        .map(|(d, _)| *d);
    let season_length_days = match (greenup_date, senescence_date) {
        (Some(start), Some(end)) => Some((end - start).num_days()),
        _ => None,
    };

    let stages = samples
        .iter()
        .map(|&(date, value)| StageSample {
            date,
            value,
            stage: PhenologyStage::from_native(value, &config.stages),
        })
        .collect();

    Some(SeasonMetrics {
        greenup_date,
        peak_date,
        peak_value,
        senescence_date,
        season_length_days,
        stages,
    })
}
