//! Next-bloom prediction from historical statistics.

use crate::config::PredictorConfig;
use crate::error::{PhenologyError, PhenologyResult};
use crate::models::{
    date_from_day_of_year, offset_days, BloomDetection, ConfidenceLabel, Prediction,
    PredictionBasis,
};
use crate::services::history::HistoryStatistics;

/// Predict the bloom onset for `as_of_year` at latitude `lat`.
///
/// `current` is the detector outcome for the current partial season, or
/// `None` when no current-season series could be built. The anchor is, in
/// order of preference:
/// 1. an onset already detected in the current season
/// 2. the circular mean onset of past seasons
/// 3. a latitude-dependent climatological onset, labelled `low`
///
/// The window is `± min(k * stddev, max_window_days)`, falling back to a
/// fixed spread when fewer than two past onsets exist.
///
/// Fails with `InsufficientHistory` only when no season has been recorded
/// and there is no current-season series either.
pub fn predict(
    stats: &HistoryStatistics,
    current: Option<&BloomDetection>,
    as_of_year: i32,
    lat: f64,
    config: &PredictorConfig,
) -> PhenologyResult<Prediction> {
    let observed = current.and_then(|c| c.event()).map(|e| e.onset_date);

    let (predicted_date, basis) = match (observed, stats.mean_onset_doy) {
        (Some(onset), _) => (onset, PredictionBasis::ObservedOnset),
        (None, Some(mean_doy)) => (
            place_day(as_of_year, mean_doy)?,
            PredictionBasis::Historical,
        ),
        (None, None) if stats.years_with_data == 0 && current.is_none() => {
            return Err(PhenologyError::insufficient_history(format!(
                "no recorded seasons and no current-season signal in {}",
                as_of_year
            )));
        }
        (None, None) => (
            place_day(as_of_year, climatological_onset_doy(lat, config))?,
            PredictionBasis::Climatology,
        ),
    };

    let variability_days = stats
        .stddev_onset_doy
        .unwrap_or(config.fallback_stddev_days);
    let half_window = (config.window_k * variability_days)
        .min(config.max_window_days)
        .round() as i64;

    let confidence_label = match basis {
        PredictionBasis::Climatology => ConfidenceLabel::Low,
        _ => confidence_label(stats, config),
    };

    Ok(Prediction {
        predicted_date,
        earliest_date: offset_days(predicted_date, -half_window),
        latest_date: offset_days(predicted_date, half_window),
        confidence_label,
        basis,
        years_used: stats.years_with_data,
        variability_days,
    })
}

/// Default onset day for a latitude: later towards the north, earlier
/// towards the south, shifted by whole days.
pub fn climatological_onset_doy(lat: f64, config: &PredictorConfig) -> f64 {
    config.climatology_onset_doy + (lat / 90.0 * config.climatology_latitude_shift_days).trunc()
}

fn place_day(year: i32, doy: f64) -> PhenologyResult<chrono::NaiveDate> {
    date_from_day_of_year(year, doy).ok_or_else(|| {
        PhenologyError::internal(format!("cannot place day {:.1} in year {}", doy, year))
    })
}

/// `high` needs enough seasons and a tight spread; `medium` just enough
/// seasons.
pub fn confidence_label(stats: &HistoryStatistics, config: &PredictorConfig) -> ConfidenceLabel {
    let tight = stats
        .stddev_onset_doy
        .map(|s| s <= config.high_max_stddev_days)
        .unwrap_or(false);

    if stats.years_with_data >= config.high_min_years && tight {
        ConfidenceLabel::High
    } else if stats.years_with_data >= config.medium_min_years {
        ConfidenceLabel::Medium
    } else {
        ConfidenceLabel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LowConfidence;
    use crate::models::{BloomEvent, NoBloomReason};
    use chrono::{Duration, NaiveDate};

    fn stats(
        mean: Option<f64>,
        stddev: Option<f64>,
        years_with_data: usize,
        years_with_bloom: usize,
    ) -> HistoryStatistics {
        HistoryStatistics {
            mean_onset_doy: mean,
            stddev_onset_doy: stddev,
            mean_duration_days: None,
            years_with_data,
            years_with_bloom,
            low_confidence: (years_with_bloom < 2)
                .then(|| LowConfidence::new(years_with_data, "test")),
        }
    }

    const LAT: f64 = 38.9;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tight_history_is_high_confidence() {
        let s = stats(Some(71.25), Some(2.99), 4, 4);
        let p = predict(&s, None, 2025, LAT, &PredictorConfig::default()).unwrap();

        assert_eq!(p.predicted_date, date(2025, 3, 12));
        assert_eq!(p.half_window_days(), 4);
        assert_eq!(p.earliest_date, date(2025, 3, 8));
        assert_eq!(p.latest_date, date(2025, 3, 16));
        assert_eq!(p.confidence_label, ConfidenceLabel::High);
        assert_eq!(p.basis, PredictionBasis::Historical);
        assert_eq!(p.years_used, 4);
    }

    #[test]
    fn test_wide_history_is_medium() {
        let s = stats(Some(100.0), Some(25.0), 6, 6);
        let p = predict(&s, None, 2025, LAT, &PredictorConfig::default()).unwrap();
        assert_eq!(p.confidence_label, ConfidenceLabel::Medium);
        assert_eq!(p.half_window_days(), 38);
    }

    #[test]
    fn test_window_is_capped() {
        let s = stats(Some(100.0), Some(90.0), 5, 5);
        let p = predict(&s, None, 2025, LAT, &PredictorConfig::default()).unwrap();
        assert_eq!(p.half_window_days(), 60);
    }

    #[test]
    fn test_single_season_uses_fallback_spread() {
        let s = stats(Some(120.0), None, 1, 1);
        let p = predict(&s, None, 2025, LAT, &PredictorConfig::default()).unwrap();
        assert_eq!(p.confidence_label, ConfidenceLabel::Low);
        assert_eq!(p.variability_days, 7.0);
        // 1.5 * 7 = 10.5 rounds away from zero
        assert_eq!(p.half_window_days(), 11);
    }

    #[test]
    fn test_observed_onset_overrides_history() {
        let onset = date(2025, 3, 20);
        let current = BloomDetection::Detected(BloomEvent {
            event_id: None,
            onset_date: onset,
            peak_date: onset + Duration::days(8),
            decline_date: None,
            peak_value: 0.8,
            baseline: 0.5,
            confidence: 0.7,
        });
        let s = stats(Some(71.0), Some(3.0), 4, 4);
        let p = predict(&s, Some(&current), 2025, LAT, &PredictorConfig::default()).unwrap();

        assert_eq!(p.predicted_date, onset);
        assert_eq!(p.basis, PredictionBasis::ObservedOnset);
    }

    #[test]
    fn test_observed_onset_without_history() {
        let onset = date(2025, 4, 2);
        let current = BloomDetection::Detected(BloomEvent {
            event_id: None,
            onset_date: onset,
            peak_date: onset,
            decline_date: None,
            peak_value: 0.8,
            baseline: 0.5,
            confidence: 0.7,
        });
        let s = stats(None, None, 0, 0);
        let p = predict(&s, Some(&current), 2025, LAT, &PredictorConfig::default()).unwrap();
        assert_eq!(p.predicted_date, onset);
        assert_eq!(p.confidence_label, ConfidenceLabel::Low);
    }

    #[test]
    fn test_seasons_without_onsets_fall_back_to_climatology() {
        let s = stats(None, None, 3, 0);
        let current = BloomDetection::NotDetected {
            reason: NoBloomReason::NoRiseAboveBaseline,
        };
        let p = predict(&s, Some(&current), 2025, LAT, &PredictorConfig::default()).unwrap();

        // 100 + trunc(38.9 / 90 * 30) = day 112
        assert_eq!(p.predicted_date, date(2025, 4, 22));
        assert_eq!(p.basis, PredictionBasis::Climatology);
        assert_eq!(p.confidence_label, ConfidenceLabel::Low);
        assert_eq!(p.half_window_days(), 11);
        assert_eq!(p.years_used, 3);
    }

    #[test]
    fn test_current_series_alone_falls_back_to_climatology() {
        let s = stats(None, None, 0, 0);
        let current = BloomDetection::NotDetected {
            reason: NoBloomReason::EmptySeries,
        };
        let p = predict(&s, Some(&current), 2025, -45.0, &PredictorConfig::default()).unwrap();
        assert_eq!(p.predicted_date, date_from_day_of_year(2025, 85.0).unwrap());
        assert_eq!(p.basis, PredictionBasis::Climatology);
    }

    #[test]
    fn test_recorded_seasons_without_current_series_still_predict() {
        let s = stats(None, None, 2, 0);
        let p = predict(&s, None, 2025, LAT, &PredictorConfig::default()).unwrap();
        assert_eq!(p.basis, PredictionBasis::Climatology);
        assert_eq!(p.confidence_label, ConfidenceLabel::Low);
    }

    #[test]
    fn test_nothing_at_all_is_insufficient_history() {
        let s = stats(None, None, 0, 0);
        let err = predict(&s, None, 2025, LAT, &PredictorConfig::default()).unwrap_err();
        assert!(matches!(err, PhenologyError::InsufficientHistory { .. }));
    }

    #[test]
    fn test_window_crosses_year_boundary() {
        let s = stats(Some(3.0), Some(4.0), 4, 4);
        let p = predict(&s, None, 2025, LAT, &PredictorConfig::default()).unwrap();
        assert_eq!(p.predicted_date, date(2025, 1, 3));
        assert_eq!(p.earliest_date, date(2024, 12, 28));
    }
}
