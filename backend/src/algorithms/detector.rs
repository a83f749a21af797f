//! Bloom event detection over a normalized series.
//!
//! A single forward pass drives a small state machine:
//!
//! ```text
//! Baseline → Rising → PeakCandidate → Declining → Done
//!               ↑            │
//!               └────────────┘  (new higher value before confirmation)
//! ```
//!
//! All thresholds are in unit-scale values, the same space as
//! [`NormalizedSeries`] samples.

use chrono::NaiveDate;

use crate::config::DetectorConfig;
use crate::models::{BloomDetection, BloomEvent, NoBloomReason, NormalizedSeries, SeriesPoint};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Baseline,
    Rising,
    PeakCandidate,
    Declining,
    Done,
}

/// Detect the first bloom event in `series`.
///
/// Returns `NotDetected` when the series is empty or never exceeds
/// `baseline + onset_threshold`. An event whose decline falls past the end
/// of the series is still reported, with `decline_date` absent.
pub fn detect(series: &NormalizedSeries, config: &DetectorConfig) -> BloomDetection {
    let points = &series.points;
    if points.is_empty() {
        return BloomDetection::NotDetected {
            reason: NoBloomReason::EmptySeries,
        };
    }

    let window = config.baseline_window.max(1).min(points.len());
    let baseline_values: Vec<f64> = points[..window].iter().map(|p| p.value).collect();
    let baseline = percentile(&baseline_values, config.baseline_percentile);
    let onset_level = baseline + config.onset_threshold;

    let mut state = State::Baseline;
    let mut onset: Option<usize> = None;
    let mut candidate: usize = 0;
    let mut decline: Option<usize> = None;

    for (i, point) in points.iter().enumerate() {
        let value = point.value;
        match state {
            State::Baseline => {
                if value > onset_level + EPS {
                    onset = Some(i);
                    candidate = i;
                    state = State::Rising;
                }
            }
            State::Rising | State::PeakCandidate => {
                let peak = points[candidate].value;
                if value > peak + EPS {
                    candidate = i;
                    state = State::Rising;
                } else if value < peak - EPS {
                    state = State::PeakCandidate;
                    if peak - value >= config.peak_prominence - EPS {
                        state = State::Declining;
                        if value <= onset_level + EPS {
                            decline = Some(i);
                            state = State::Done;
                        }
                    }
                }
            }
            State::Declining => {
                if value <= onset_level + EPS {
                    decline = Some(i);
                    state = State::Done;
                }
            }
            State::Done => break,
        }
    }

    let Some(onset) = onset else {
        log::debug!(
            "No rise above baseline {:.3} + {:.3} across {} samples",
            baseline,
            config.onset_threshold,
            points.len()
        );
        return BloomDetection::NotDetected {
            reason: NoBloomReason::NoRiseAboveBaseline,
        };
    };

    let peak = &points[candidate];
    let last = decline.unwrap_or(points.len() - 1);
    let confidence = confidence(
        &points[onset..=last],
        baseline,
        peak.value,
        points[onset].date,
        peak.date,
        config,
    );

    BloomDetection::Detected(BloomEvent {
        event_id: None,
        onset_date: points[onset].date,
        peak_date: peak.date,
        decline_date: decline.map(|i| points[i].date),
        peak_value: peak.value,
        baseline,
        confidence,
    })
}

/// Percentile of `values` with linear interpolation between ranks.
///
/// `p` is a fraction in [0, 1]; 0 yields the minimum.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Weighted confidence in [0, 1].
fn confidence(
    event_points: &[SeriesPoint],
    baseline: f64,
    peak_value: f64,
    onset: NaiveDate,
    peak: NaiveDate,
    config: &DetectorConfig,
) -> f64 {
    let magnitude = ((peak_value - baseline) / config.expected_dynamic_range).clamp(0.0, 1.0);

    let observed = event_points.iter().filter(|p| !p.interpolated).count();
    let quality = if event_points.is_empty() {
        0.0
    } else {
        observed as f64 / event_points.len() as f64
    };

    let duration = duration_score((peak - onset).num_days(), config);

    let total_weight = config.magnitude_weight + config.quality_weight + config.duration_weight;
    if total_weight <= 0.0 {
        return 0.0;
    }
    let score = config.magnitude_weight * magnitude
        + config.quality_weight * quality
        + config.duration_weight * duration;
    (score / total_weight).clamp(0.0, 1.0)
}

/// 1 inside the plausible rise span, decaying linearly to 0 outside it.
pub fn duration_score(rise_days: i64, config: &DetectorConfig) -> f64 {
    let outside = if rise_days < config.plausible_min_days {
        config.plausible_min_days - rise_days
    } else if rise_days > config.plausible_max_days {
        rise_days - config.plausible_max_days
    } else {
        return 1.0;
    };
    if config.duration_decay_days <= 0 {
        return 0.0;
    }
    (1.0 - outside as f64 / config.duration_decay_days as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod detector_tests;
