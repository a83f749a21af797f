//! Regional bloom map: recent greenness over a coarse grid of points.

use serde::{Deserialize, Serialize};

use crate::config::RegionConfig;
use crate::error::{PhenologyError, PhenologyResult};
use crate::models::{GeoPoint, IndexKind, Observation};

/// Axis-aligned region in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Validate corners and ordering.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> PhenologyResult<Self> {
        GeoPoint::new(min_lat, min_lon)?;
        GeoPoint::new(max_lat, max_lon)?;
        if min_lat >= max_lat || min_lon >= max_lon {
            return Err(PhenologyError::invalid_location(format!(
                "bounding box is empty: lat {}..{}, lon {}..{}",
                min_lat, max_lat, min_lon, max_lon
            )));
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }
}

/// Grid points from the min corner towards (excluding) the max corner.
///
/// Each axis is capped at `max_cells_per_axis` points.
pub fn grid_points(
    bbox: &BoundingBox,
    resolution: f64,
    max_cells_per_axis: usize,
) -> PhenologyResult<Vec<GeoPoint>> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(PhenologyError::invalid_request(format!(
            "resolution must be positive, got {}",
            resolution
        )));
    }

    let axis = |min: f64, max: f64| -> Vec<f64> {
        (0..max_cells_per_axis)
            .map(|i| min + i as f64 * resolution)
            .take_while(|v| *v < max)
            .collect()
    };

    let lats = axis(bbox.min_lat, bbox.max_lat);
    let lons = axis(bbox.min_lon, bbox.max_lon);

    let mut points = Vec::with_capacity(lats.len() * lons.len());
    for &lat in &lats {
        for &lon in &lons {
            points.push(GeoPoint::new(lat, lon)?);
        }
    }
    Ok(points)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    Blooming,
    Vegetated,
    Dormant,
}

pub fn classify(mean_native: f64, config: &RegionConfig) -> CellStatus {
    if mean_native > config.bloom_threshold {
        CellStatus::Blooming
    } else if mean_native > config.vegetated_threshold {
        CellStatus::Vegetated
    } else {
        CellStatus::Dormant
    }
}

/// Mean of the usable native values, if any.
pub fn mean_index(observations: &[Observation], kind: IndexKind) -> Option<f64> {
    let values: Vec<f64> = observations
        .iter()
        .filter_map(|o| o.usable_value(kind))
        .collect();
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCell {
    pub lat: f64,
    pub lon: f64,
    /// Mean native index value over the lookback window
    pub mean_index: f64,
    pub status: CellStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloomMap {
    pub bbox: BoundingBox,
    pub resolution: f64,
    pub index: IndexKind,
    pub as_of: chrono::NaiveDate,
    pub cells: Vec<RegionCell>,
    /// Grid points for which the provider returned nothing usable
    pub cells_without_data: usize,
}
