//! Series normalization: quality filtering, rescaling, fixed-cadence
//! resampling and edge-aware smoothing.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::config::NormalizerConfig;
use crate::error::{PhenologyError, PhenologyResult};
use crate::models::{to_unit_scale, DateRange, IndexKind, NormalizedSeries, Observation, SeriesPoint};

/// Turn raw provider observations into a gapless unit-scale series.
///
/// Cloud and missing samples are dropped (never read as zero). When several
/// usable samples share a date the one that arrived last wins. Values are
/// rescaled from [-1, 1] to [0, 1] before resampling onto the grid
/// `range.start + k * cadence` and smoothing with a centered moving average.
///
/// Fails with `InsufficientData` when no usable sample exists.
pub fn normalize(
    raw: &[Observation],
    kind: IndexKind,
    range: &DateRange,
    config: &NormalizerConfig,
) -> PhenologyResult<NormalizedSeries> {
    if config.cadence_days == 0 {
        return Err(PhenologyError::invalid_request("cadence must be at least 1 day"));
    }

    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut dropped = 0usize;
    for obs in raw {
        match obs.usable_value(kind) {
            Some(v) => {
                by_date.insert(obs.date, to_unit_scale(v).clamp(0.0, 1.0));
            }
            None => dropped += 1,
        }
    }

    if by_date.is_empty() {
        return Err(PhenologyError::insufficient_data(format!(
            "no usable {} samples between {} and {} ({} raw observations)",
            kind,
            range.start,
            range.end,
            raw.len()
        )));
    }

    let samples: Vec<(NaiveDate, f64)> = by_date.into_iter().collect();
    log::debug!(
        "Normalizing {} usable samples ({} dropped) onto a {}-day grid",
        samples.len(),
        dropped,
        config.cadence_days
    );

    let cadence = config.cadence_days as i64;
    let steps = range.span_days() / cadence;
    let mut dates = Vec::with_capacity(steps as usize + 1);
    let mut values = Vec::with_capacity(steps as usize + 1);
    let mut interpolated = Vec::with_capacity(steps as usize + 1);

    for k in 0..=steps {
        let grid_date = range.start + Duration::days(k * cadence);
        let (value, filled) = resample_at(&samples, grid_date, cadence)
            .ok_or_else(|| PhenologyError::internal("resampling without samples"))?;
        dates.push(grid_date);
        values.push(value);
        interpolated.push(filled);
    }

    let smoothed = moving_average(&values, config.smoothing_window);
    let points = dates
        .into_iter()
        .zip(smoothed)
        .zip(interpolated)
        .map(|((date, value), interpolated)| SeriesPoint {
            date,
            value: value.clamp(0.0, 1.0),
            interpolated,
        })
        .collect();

    NormalizedSeries::new(kind, config.cadence_days, points)
}

/// Value for one grid date and whether it had to be filled.
///
/// `samples` must be sorted by date; `None` only when it is empty.
fn resample_at(
    samples: &[(NaiveDate, f64)],
    grid_date: NaiveDate,
    cadence: i64,
) -> Option<(f64, bool)> {
    let idx = samples.partition_point(|(d, _)| *d < grid_date);
    let before = idx.checked_sub(1).map(|i| samples[i]);
    let after = samples.get(idx).copied();

    let distance = |d: NaiveDate| (d - grid_date).num_days().abs();
    let nearest = match (before, after) {
        (Some(b), Some(a)) if distance(a.0) < distance(b.0) => a,
        (Some(s), _) | (None, Some(s)) => s,
        (None, None) => return None,
    };
    if 2 * distance(nearest.0) <= cadence {
        return Some((nearest.1, false));
    }

    match (before, after) {
        (Some((d0, v0)), Some((d1, v1))) => {
            let span = (d1 - d0).num_days() as f64;
            let t = (grid_date - d0).num_days() as f64 / span;
            Some((v0 + (v1 - v0) * t, true))
        }
        _ => Some((nearest.1, true)),
    }
}

/// Centered moving average with a window that shrinks at the edges.
///
/// For even widths the extra sample is taken from the right. A width of 0
/// or 1 returns the input unchanged.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let left = (window - 1) / 2;
    let right = window / 2;
    let last = values.len() - 1;

    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(left);
            let hi = (i + right).min(last);
            let slice = &values[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityFlag;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(cadence_days: u32, smoothing_window: usize) -> NormalizerConfig {
        NormalizerConfig {
            cadence_days,
            smoothing_window,
            index: IndexKind::Ndvi,
        }
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    #[test]
    fn test_grid_length_matches_range() {
        let start = date(2024, 1, 1);
        let raw = vec![Observation::valid_ndvi(start, 0.2)];
        let series = normalize(
            &raw,
            IndexKind::Ndvi,
            &range(start, date(2024, 4, 26)),
            &config(16, 3),
        )
        .unwrap();

        // 116 days / 16 = 7 full steps, plus the start sample
        assert_eq!(series.len(), 8);
        assert_eq!(series.last_date(), Some(date(2024, 4, 22)));
    }

    #[test]
    fn test_rescales_native_values() {
        let start = date(2024, 1, 1);
        let raw = vec![
            Observation::valid_ndvi(start, -1.0),
            Observation::valid_ndvi(start + Duration::days(8), 1.0),
            Observation::valid_ndvi(start + Duration::days(16), 0.0),
        ];
        let series = normalize(
            &raw,
            IndexKind::Ndvi,
            &range(start, start + Duration::days(16)),
            &config(8, 1),
        )
        .unwrap();

        assert_eq!(series.values(), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_cloud_samples_are_dropped_not_zeroed() {
        let start = date(2024, 1, 1);
        let raw = vec![
            Observation::valid_ndvi(start, 0.4),
            Observation::new(start + Duration::days(8), Some(-0.9), None, QualityFlag::Cloud),
            Observation::new(start + Duration::days(16), None, None, QualityFlag::Missing),
            Observation::valid_ndvi(start + Duration::days(24), 0.4),
        ];
        let series = normalize(
            &raw,
            IndexKind::Ndvi,
            &range(start, start + Duration::days(24)),
            &config(8, 1),
        )
        .unwrap();

        for point in &series.points {
            assert!((point.value - 0.7).abs() < 1e-12);
        }
        assert!(series.points[1].interpolated);
        assert!(series.points[2].interpolated);
        assert!(!series.points[3].interpolated);
    }

    #[test]
    fn test_duplicate_dates_prefer_valid_then_latest() {
        let d = date(2024, 5, 1);
        let raw = vec![
            Observation::valid_ndvi(d, 0.2),
            Observation::new(d, Some(0.9), None, QualityFlag::Cloud),
            Observation::valid_ndvi(d, 0.6),
            Observation::new(d, None, None, QualityFlag::Missing),
        ];
        let series = normalize(&raw, IndexKind::Ndvi, &range(d, d), &config(8, 1)).unwrap();

        assert_eq!(series.len(), 1);
        assert!((series.points[0].value - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_linear_interpolation_between_neighbours() {
        let start = date(2024, 1, 1);
        let raw = vec![
            Observation::valid_ndvi(start, 0.0),
            Observation::valid_ndvi(start + Duration::days(32), 0.4),
        ];
        let series = normalize(
            &raw,
            IndexKind::Ndvi,
            &range(start, start + Duration::days(32)),
            &config(16, 1),
        )
        .unwrap();

        // Unit scale 0.5 -> 0.7, midpoint 0.6
        assert!((series.points[1].value - 0.6).abs() < 1e-12);
        assert!(series.points[1].interpolated);
    }

    #[test]
    fn test_edge_hold_outside_samples() {
        let start = date(2024, 1, 1);
        let raw = vec![Observation::valid_ndvi(start + Duration::days(32), 0.2)];
        let series = normalize(
            &raw,
            IndexKind::Ndvi,
            &range(start, start + Duration::days(64)),
            &config(16, 1),
        )
        .unwrap();

        assert_eq!(series.len(), 5);
        for point in &series.points {
            assert!((point.value - 0.6).abs() < 1e-12);
        }
        assert!(series.points[0].interpolated);
        assert!(!series.points[2].interpolated);
        assert!(series.points[4].interpolated);
    }

    #[test]
    fn test_snaps_within_half_cadence() {
        let start = date(2024, 1, 1);
        let raw = vec![
            Observation::valid_ndvi(start + Duration::days(7), 0.2),
            Observation::valid_ndvi(start + Duration::days(40), 0.6),
        ];
        let series = normalize(
            &raw,
            IndexKind::Ndvi,
            &range(start, start + Duration::days(48)),
            &config(16, 1),
        )
        .unwrap();

        assert!(!series.points[0].interpolated);
        assert!((series.points[0].value - 0.6).abs() < 1e-12);
        assert!(series.points[1].interpolated);
        assert!(!series.points[2].interpolated);
        assert!(!series.points[3].interpolated);
    }

    #[test]
    fn test_no_usable_samples_is_insufficient_data() {
        let start = date(2024, 1, 1);
        let raw = vec![Observation::cloud(start), Observation::cloud(start + Duration::days(8))];
        let result = normalize(
            &raw,
            IndexKind::Ndvi,
            &range(start, start + Duration::days(16)),
            &config(8, 3),
        );
        assert!(matches!(result, Err(PhenologyError::InsufficientData { .. })));

        let result = normalize(&[], IndexKind::Ndvi, &range(start, start), &config(8, 3));
        assert!(matches!(result, Err(PhenologyError::InsufficientData { .. })));
    }

    #[test]
    fn test_evi_reads_evi_values() {
        let start = date(2024, 1, 1);
        let raw = vec![Observation::new(start, Some(0.8), Some(0.2), QualityFlag::Valid)];
        let series =
            normalize(&raw, IndexKind::Evi, &range(start, start), &config(8, 1)).unwrap();
        assert!((series.points[0].value - 0.6).abs() < 1e-12);
        assert_eq!(series.index, IndexKind::Evi);
    }

    #[test]
    fn test_moving_average_shrinks_at_edges() {
        let smoothed = moving_average(&[0.0, 0.3, 0.6, 0.9], 3);
        assert!((smoothed[0] - 0.15).abs() < 1e-12);
        assert!((smoothed[1] - 0.3).abs() < 1e-12);
        assert!((smoothed[2] - 0.6).abs() < 1e-12);
        assert!((smoothed[3] - 0.75).abs() < 1e-12);

        assert_eq!(moving_average(&[0.1, 0.9], 1), vec![0.1, 0.9]);
        assert!(moving_average(&[], 3).is_empty());
    }

    #[test]
    fn test_renormalizing_is_idempotent_without_smoothing() {
        let start = date(2024, 1, 1);
        let raw: Vec<Observation> = (0..10)
            .map(|i| Observation::valid_ndvi(start + Duration::days(i * 8), 0.05 * i as f64))
            .collect();
        let r = range(start, start + Duration::days(72));
        let first = normalize(&raw, IndexKind::Ndvi, &r, &config(8, 1)).unwrap();
        let second = normalize(&first.to_observations(), IndexKind::Ndvi, &r, &config(8, 1)).unwrap();

        for (a, b) in first.points.iter().zip(&second.points) {
            assert!((a.value - b.value).abs() < 1e-12);
        }
    }

    proptest! {
        #[test]
        fn prop_output_is_gapless_and_bounded(
            values in proptest::collection::vec(proptest::option::of(-1.5f64..1.5), 1..40),
            cadence in 1u32..20,
            window in 1usize..6,
        ) {
            let start = date(2023, 1, 1);
            let raw: Vec<Observation> = values
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Some(v) => Observation::valid_ndvi(start + Duration::days(i as i64 * 5), *v),
                    None => Observation::cloud(start + Duration::days(i as i64 * 5)),
                })
                .collect();
            let end = start + Duration::days(values.len() as i64 * 5);
            let r = range(start, end);

            match normalize(&raw, IndexKind::Ndvi, &r, &config(cadence, window)) {
                Ok(series) => {
                    let expected = r.span_days() / cadence as i64 + 1;
                    prop_assert_eq!(series.len() as i64, expected);
                    for point in &series.points {
                        prop_assert!((0.0..=1.0).contains(&point.value));
                    }
                    for pair in series.points.windows(2) {
                        prop_assert_eq!((pair[1].date - pair[0].date).num_days(), cadence as i64);
                    }
                }
                Err(e) => {
                    prop_assert!(values.iter().all(|v| v.is_none()));
                    prop_assert!(matches!(e, PhenologyError::InsufficientData { .. }), "unexpected error");
                }
            }
        }

        #[test]
        fn prop_constant_series_is_a_fixed_point(level in -1.0f64..1.0, window in 1usize..7) {
            let start = date(2023, 3, 1);
            let raw: Vec<Observation> = (0..12)
                .map(|i| Observation::valid_ndvi(start + Duration::days(i * 8), level))
                .collect();
            let r = range(start, start + Duration::days(88));
            let first = normalize(&raw, IndexKind::Ndvi, &r, &config(8, window)).unwrap();
            let second =
                normalize(&first.to_observations(), IndexKind::Ndvi, &r, &config(8, window)).unwrap();
            for (a, b) in first.points.iter().zip(&second.points) {
                prop_assert!((a.value - b.value).abs() < 1e-9);
            }
        }
    }
}
