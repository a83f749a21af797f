//! Circular statistics for day-of-year values.
//!
//! Onsets cluster around a point on the annual cycle, and a plain arithmetic
//! mean of {350, 5} lands in midsummer. Every value is mapped onto a
//! 365-day circle first.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::models::DAYS_PER_YEAR;

/// Mean direction and spread of a set of days of year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularSummary {
    /// Mean day of year in (0, 365]
    pub mean_doy: f64,
    /// Mean resultant length R̄ in [0, 1]; 1 means all values coincide
    pub resultant_length: f64,
    /// Circular standard deviation in days, present with two or more values
    pub stddev_days: Option<f64>,
    pub count: usize,
}

fn to_angle(doy: f64) -> f64 {
    doy / DAYS_PER_YEAR * TAU
}

fn to_days(angle: f64) -> f64 {
    angle / TAU * DAYS_PER_YEAR
}

/// Summarize days of year on the annual circle. `None` for an empty slice.
///
/// The standard deviation is `sqrt(-2 ln R̄)` converted to days and scaled
/// by `sqrt(n / (n - 1))`, so that tightly clustered values match their
/// ordinary sample standard deviation.
pub fn circular_summary(doys: &[f64]) -> Option<CircularSummary> {
    if doys.is_empty() {
        return None;
    }
    let n = doys.len() as f64;
    let (sin_sum, cos_sum) = doys.iter().fold((0.0, 0.0), |(s, c), &doy| {
        let angle = to_angle(doy);
        (s + angle.sin(), c + angle.cos())
    });

    let r = ((sin_sum / n).powi(2) + (cos_sum / n).powi(2)).sqrt().min(1.0);

    let mut mean_doy = to_days(sin_sum.atan2(cos_sum)).rem_euclid(DAYS_PER_YEAR);
    if mean_doy <= 0.0 {
        mean_doy = DAYS_PER_YEAR;
    }

    let stddev_days = (doys.len() >= 2).then(|| {
        let spread = (-2.0 * r.max(f64::MIN_POSITIVE).ln()).max(0.0).sqrt();
        to_days(spread) * (n / (n - 1.0)).sqrt()
    });

    Some(CircularSummary {
        mean_doy,
        resultant_length: r,
        stddev_days,
        count: doys.len(),
    })
}

/// Shortest distance between two days of year around the circle.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(DAYS_PER_YEAR);
    d.min(DAYS_PER_YEAR - d)
}
