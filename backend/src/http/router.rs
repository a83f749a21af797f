//! HTTP router configuration.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Request bodies are small JSON objects.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main application router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/vegetation/indices", get(handlers::get_indices))
        .route("/bloom/detect", post(handlers::detect_bloom))
        .route("/bloom/predict", post(handlers::predict_bloom))
        .route("/phenology/metrics", post(handlers::phenology_metrics))
        .route("/regions/bloom-map", get(handlers::bloom_map));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::provider::SyntheticProvider;
    use crate::services::PhenologyEngine;

    #[test]
    fn test_router_creation() {
        let engine = PhenologyEngine::builder(Arc::new(SyntheticProvider::new()))
            .build()
            .unwrap();
        let _router = create_router(AppState::new(Arc::new(engine)));
    }
}
