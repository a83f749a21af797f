//! Normalized, fixed-cadence vegetation index series.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::observation::{IndexKind, Observation, QualityFlag};
use crate::error::{PhenologyError, PhenologyResult};

/// Map a native index value in [-1, 1] onto [0, 1].
pub fn to_unit_scale(native: f64) -> f64 {
    (native + 1.0) / 2.0
}

/// Inverse of [`to_unit_scale`].
pub fn to_native_scale(unit: f64) -> f64 {
    unit * 2.0 - 1.0
}

/// One grid sample of a normalized series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    /// Unit-scale value in [0, 1]
    pub value: f64,
    /// True when no raw sample fell within half a cadence of this grid date
    pub interpolated: bool,
}

/// Gapless series with one sample per cadence step.
///
/// Invariants (checked by [`NormalizedSeries::new`]): dates strictly
/// increasing and evenly spaced by `cadence_days`, values in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub index: IndexKind,
    pub cadence_days: u32,
    pub points: Vec<SeriesPoint>,
}

impl NormalizedSeries {
    pub fn new(
        index: IndexKind,
        cadence_days: u32,
        points: Vec<SeriesPoint>,
    ) -> PhenologyResult<Self> {
        if cadence_days == 0 {
            return Err(PhenologyError::invalid_request("cadence must be at least 1 day"));
        }
        for pair in points.windows(2) {
            let step = (pair[1].date - pair[0].date).num_days();
            if step != cadence_days as i64 {
                return Err(PhenologyError::internal(format!(
                    "series step {} -> {} is {} days, expected {}",
                    pair[0].date, pair[1].date, step, cadence_days
                )));
            }
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.value.is_finite() || !(0.0..=1.0).contains(&p.value))
        {
            return Err(PhenologyError::internal(format!(
                "series value {} on {} outside [0, 1]",
                bad.value, bad.date
            )));
        }
        Ok(Self {
            index,
            cadence_days,
            points,
        })
    }

    /// Build a fully observed series from unit-scale values starting at `start`.
    pub fn from_values(
        index: IndexKind,
        start: NaiveDate,
        cadence_days: u32,
        values: &[f64],
    ) -> PhenologyResult<Self> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| SeriesPoint {
                date: start + Duration::days(i as i64 * cadence_days as i64),
                value,
                interpolated: false,
            })
            .collect();
        Self::new(index, cadence_days, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Convert back to native-scale observations, e.g. to re-normalize.
    pub fn to_observations(&self) -> Vec<Observation> {
        self.points
            .iter()
            .map(|p| {
                let native = Some(to_native_scale(p.value));
                let (ndvi, evi) = match self.index {
                    IndexKind::Ndvi => (native, None),
                    IndexKind::Evi => (None, native),
                };
                Observation::new(p.date, ndvi, evi, QualityFlag::Valid)
            })
            .collect()
    }

    /// Summary statistics in native index units.
    pub fn statistics(&self) -> SeriesStatistics {
        let native: Vec<f64> = self.points.iter().map(|p| to_native_scale(p.value)).collect();
        let count = native.len();
        let interpolated_count = self.points.iter().filter(|p| p.interpolated).count();

        if count == 0 {
            return SeriesStatistics {
                mean: 0.0,
                max: 0.0,
                min: 0.0,
                std: 0.0,
                count,
                interpolated_count,
            };
        }

        let mean = native.iter().sum::<f64>() / count as f64;
        let max = native.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = native.iter().copied().fold(f64::INFINITY, f64::min);
        let variance = native.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        SeriesStatistics {
            mean,
            max,
            min,
            std: variance.sqrt(),
            count,
            interpolated_count,
        }
    }
}

/// Summary of a normalized series, expressed in native index units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub std: f64,
    pub count: usize,
    pub interpolated_count: usize,
}
