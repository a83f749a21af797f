//! Data Transfer Objects for the HTTP API.
//!
//! Responses reuse the engine's result types, which already derive
//! `Serialize`; only request shapes and the health payload live here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::IndexKind;
use crate::services::CacheStats;

pub use crate::services::{
    BloomMap, DetectionResult, IndicesResult, MetricsResult, PredictionResult,
};

/// Query string for `GET /v1/vegetation/indices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicesQuery {
    pub lat: f64,
    pub lon: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Defaults to the engine's configured index
    #[serde(default)]
    pub index: Option<IndexKind>,
}

/// Request body for `POST /v1/bloom/detect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    pub lat: f64,
    pub lon: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub index: Option<IndexKind>,
}

/// Request body for `POST /v1/bloom/predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub lat: f64,
    pub lon: f64,
    /// Past seasons to learn from (default: 5)
    #[serde(default)]
    pub years_back: Option<u32>,
}

/// Request body for `POST /v1/phenology/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRequest {
    pub lat: f64,
    pub lon: f64,
    /// Calendar year (default: the current one)
    #[serde(default)]
    pub year: Option<i32>,
}

/// Query string for `GET /v1/regions/bloom-map`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloomMapQuery {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    /// Grid spacing in degrees
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_resolution() -> f64 {
    1.0
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub version: String,
    /// Name of the active observation provider
    pub provider: String,
    pub history_store: bool,
    pub cache: CacheStats,
}
