//! HTTP request handlers.
//!
//! Each handler unpacks its request, calls the engine and serializes the
//! engine's result. Validation lives in the engine so the REST surface and
//! library callers reject the same inputs.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};

use super::dto::{
    BloomMap, BloomMapQuery, DetectRequest, DetectionResult, HealthResponse, IndicesQuery,
    IndicesResult, MetricsRequest, MetricsResult, PredictRequest, PredictionResult,
};
use super::error::AppError;
use super::state::AppState;
use crate::services::BoundingBox;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn query_body<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(b)| b)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

// =============================================================================
// Health
// =============================================================================

/// GET /health
///
/// Reports the active provider, history store liveness and cache counters.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let health = state.engine.health().await;
    let status = if health.history_store {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: health.provider,
        history_store: health.history_store,
        cache: health.cache,
    }))
}

// =============================================================================
// Vegetation indices
// =============================================================================

/// GET /v1/vegetation/indices
///
/// Normalized index series and summary statistics for a point and date range.
pub async fn get_indices(
    State(state): State<AppState>,
    query: Result<Query<IndicesQuery>, QueryRejection>,
) -> HandlerResult<IndicesResult> {
    let q = query_body(query)?;
    let index = q.index.unwrap_or(state.engine.config().normalizer.index);
    let result = state
        .engine
        .get_indices_for(q.lat, q.lon, q.start_date, q.end_date, index)
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Bloom detection & prediction
// =============================================================================

/// POST /v1/bloom/detect
pub async fn detect_bloom(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> HandlerResult<DetectionResult> {
    let req = json_body(body)?;
    let index = req.index.unwrap_or(state.engine.config().normalizer.index);
    let result = state
        .engine
        .detect_bloom_for(req.lat, req.lon, req.start_date, req.end_date, index)
        .await?;
    Ok(Json(result))
}

/// POST /v1/bloom/predict
///
/// Predict the next bloom from past seasons, backfilling missing ones.
pub async fn predict_bloom(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> HandlerResult<PredictionResult> {
    let req = json_body(body)?;
    let result = state
        .engine
        .predict_bloom(req.lat, req.lon, req.years_back)
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Phenology metrics & regions
// =============================================================================

/// POST /v1/phenology/metrics
pub async fn phenology_metrics(
    State(state): State<AppState>,
    body: Result<Json<MetricsRequest>, JsonRejection>,
) -> HandlerResult<MetricsResult> {
    let req = json_body(body)?;
    let result = state
        .engine
        .phenology_metrics(req.lat, req.lon, req.year)
        .await?;
    Ok(Json(result))
}

/// GET /v1/regions/bloom-map
///
/// Recent greenness classified per grid cell over a bounding box.
pub async fn bloom_map(
    State(state): State<AppState>,
    query: Result<Query<BloomMapQuery>, QueryRejection>,
) -> HandlerResult<BloomMap> {
    let q = query_body(query)?;
    let bbox = BoundingBox::new(q.min_lat, q.max_lat, q.min_lon, q.max_lon)?;
    let result = state.engine.bloom_map(bbox, q.resolution).await?;
    Ok(Json(result))
}
