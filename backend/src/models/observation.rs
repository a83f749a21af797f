//! Raw observations and the query coordinates they are fetched for.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PhenologyError, PhenologyResult};

/// Provider-reported quality of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityFlag {
    Valid,
    Cloud,
    Missing,
}

/// Which vegetation index a series is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    #[default]
    Ndvi,
    Evi,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "ndvi",
            IndexKind::Evi => "evi",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ndvi" => Ok(Self::Ndvi),
            "evi" => Ok(Self::Evi),
            _ => Err(format!("Unknown index kind: {}", s)),
        }
    }
}

/// One provider sample for one calendar day.
///
/// Index values are in their native range (approximately [-1, 1]). Weather
/// fields are only populated by providers that derive indices from weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub ndvi: Option<f64>,
    pub evi: Option<f64>,
    pub quality_flag: QualityFlag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_mm: Option<f64>,
}

impl Observation {
    pub fn new(
        date: NaiveDate,
        ndvi: Option<f64>,
        evi: Option<f64>,
        quality_flag: QualityFlag,
    ) -> Self {
        Self {
            date,
            ndvi,
            evi,
            quality_flag,
            temperature_c: None,
            precipitation_mm: None,
        }
    }

    /// A valid NDVI-only sample.
    pub fn valid_ndvi(date: NaiveDate, ndvi: f64) -> Self {
        Self::new(date, Some(ndvi), None, QualityFlag::Valid)
    }

    /// A cloud-contaminated sample with no usable value.
    pub fn cloud(date: NaiveDate) -> Self {
        Self::new(date, None, None, QualityFlag::Cloud)
    }

    pub fn value(&self, kind: IndexKind) -> Option<f64> {
        match kind {
            IndexKind::Ndvi => self.ndvi,
            IndexKind::Evi => self.evi,
        }
    }

    /// Valid quality and a finite value for `kind`.
    pub fn usable_value(&self, kind: IndexKind) -> Option<f64> {
        if self.quality_flag != QualityFlag::Valid {
            return None;
        }
        self.value(kind).filter(|v| v.is_finite())
    }
}

/// A validated geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Validate and build a point. Latitude in [-90, 90], longitude in [-180, 180].
    pub fn new(lat: f64, lon: f64) -> PhenologyResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(PhenologyError::invalid_location(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(PhenologyError::invalid_location(format!(
                "longitude {} outside [-180, 180]",
                lon
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Key form with both coordinates rounded to `precision` decimals.
    pub fn key(&self, precision: u8) -> LocationKey {
        LocationKey::new(self.lat, self.lon, precision)
    }
}

/// Hashable location identity used by the history store and the cache.
///
/// Coordinates are stored as scaled integers so that points closer than the
/// configured precision share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    lat_scaled: i64,
    lon_scaled: i64,
    precision: u8,
}

impl LocationKey {
    pub fn new(lat: f64, lon: f64, precision: u8) -> Self {
        let scale = 10f64.powi(precision as i32);
        Self {
            lat_scaled: (lat * scale).round() as i64,
            lon_scaled: (lon * scale).round() as i64,
            precision,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat_scaled as f64 / 10f64.powi(self.precision as i32)
    }

    pub fn lon(&self) -> f64 {
        self.lon_scaled as f64 / 10f64.powi(self.precision as i32)
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.precision as usize;
        write!(f, "{:.*},{:.*}", p, self.lat(), p, self.lon())
    }
}

impl Serialize for LocationKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Inclusive calendar date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> PhenologyResult<Self> {
        if start > end {
            return Err(PhenologyError::invalid_date_range(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Jan 1 through Dec 31 of `year`.
    pub fn calendar_year(year: i32) -> PhenologyResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| PhenologyError::invalid_date_range(format!("invalid year {}", year)))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| PhenologyError::invalid_date_range(format!("invalid year {}", year)))?;
        Ok(Self { start, end })
    }

    /// Number of days from start to end.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Reject ranges covering more than `max_days` calendar days.
    pub fn limit_days(self, max_days: i64) -> PhenologyResult<Self> {
        let days = self.span_days() + 1;
        if days > max_days {
            return Err(PhenologyError::invalid_date_range(format!(
                "range {}..{} covers {} days, at most {} allowed",
                self.start, self.end, days, max_days
            )));
        }
        Ok(self)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The year both endpoints fall in, if they share one.
    pub fn single_year(&self) -> Option<i32> {
        (self.start.year() == self.end.year()).then_some(self.start.year())
    }
}
