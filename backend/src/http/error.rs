//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::PhenologyError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Request could not be parsed
    BadRequest(String),
    /// Error raised by the engine
    Engine(PhenologyError),
}

fn engine_status(err: &PhenologyError) -> StatusCode {
    match err {
        PhenologyError::InvalidLocation { .. }
        | PhenologyError::InvalidDateRange { .. }
        | PhenologyError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        PhenologyError::InsufficientData { .. } | PhenologyError::InsufficientHistory { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PhenologyError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PhenologyError::Repository(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        PhenologyError::Configuration { .. }
        | PhenologyError::Repository(_)
        | PhenologyError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("BAD_REQUEST", msg),
            ),
            AppError::Engine(e) => {
                let status = engine_status(&e);
                let mut error = ApiError::new(e.code(), e.to_string());
                if let PhenologyError::Repository(repo) = &e {
                    if let Some(operation) = &repo.context().operation {
                        error = error.with_details(format!("operation: {}", operation));
                    }
                }
                if status.is_server_error() {
                    log::error!("Request failed: {}", e);
                } else {
                    log::debug!("Request rejected: {}", e);
                }
                (status, error)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<PhenologyError> for AppError {
    fn from(err: PhenologyError) -> Self {
        AppError::Engine(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ErrorContext, RepositoryError};

    fn status_of(err: PhenologyError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(PhenologyError::invalid_location("lat=91")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PhenologyError::invalid_date_range("start after end")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PhenologyError::insufficient_data("no samples")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PhenologyError::insufficient_history("no seasons")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PhenologyError::provider_unavailable("synthetic", "timed out")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(PhenologyError::internal("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_retryable_repository_error_is_unavailable() {
        let offline =
            RepositoryError::connection("store offline", ErrorContext::new("fetch_record"));
        assert_eq!(status_of(offline.into()), StatusCode::SERVICE_UNAVAILABLE);

        let invalid =
            RepositoryError::validation("year out of range", ErrorContext::new("upsert_season"));
        assert_eq!(status_of(invalid.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_skips_empty_details() {
        let body = serde_json::to_value(ApiError::new("X", "msg")).unwrap();
        assert!(body.get("details").is_none());
        let body = serde_json::to_value(ApiError::new("X", "msg").with_details("d")).unwrap();
        assert_eq!(body["details"], "d");
    }
}
