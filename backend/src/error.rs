//! Error taxonomy for the phenology engine.
//!
//! Every failure the engine can surface is a variant of [`PhenologyError`] so
//! callers can branch on it. A season without a bloom is *not* an error; it is
//! a successful [`crate::models::BloomDetection::NotDetected`] result.

use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;

/// Result type for engine operations
pub type PhenologyResult<T> = Result<T, PhenologyError>;

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum PhenologyError {
    /// Coordinates outside the valid range. Raised before any provider call.
    #[error("Invalid location: {message}")]
    InvalidLocation { message: String },

    /// Start after end, or an unparseable range.
    #[error("Invalid date range: {message}")]
    InvalidDateRange { message: String },

    /// Any other malformed request parameter.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The observation provider failed or timed out.
    #[error("Observation provider '{provider}' unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// Normalization found zero usable samples.
    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    /// Nothing to extrapolate a prediction from.
    #[error("Insufficient history: {message}")]
    InsufficientHistory { message: String },

    /// Invalid engine configuration.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// History store failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Internal/unexpected errors.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PhenologyError {
    pub fn invalid_location(message: impl Into<String>) -> Self {
        Self::InvalidLocation {
            message: message.into(),
        }
    }

    pub fn invalid_date_range(message: impl Into<String>) -> Self {
        Self::InvalidDateRange {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub fn insufficient_history(message: impl Into<String>) -> Self {
        Self::InsufficientHistory {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidLocation { .. } => "INVALID_LOCATION",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::InsufficientHistory { .. } => "INSUFFICIENT_HISTORY",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Repository(_) => "REPOSITORY_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether the error was caused by caller input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidLocation { .. } | Self::InvalidDateRange { .. } | Self::InvalidRequest { .. }
        )
    }
}

/// Non-fatal flag attached to statistics computed from too little history.
///
/// The statistics it accompanies are still valid; callers may keep going and
/// predict from fallback spreads, but should surface the weaker footing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Low confidence: {reason} (years_with_data={years_with_data})")]
pub struct LowConfidence {
    pub years_with_data: usize,
    pub reason: String,
}

impl LowConfidence {
    pub fn new(years_with_data: usize, reason: impl Into<String>) -> Self {
        Self {
            years_with_data,
            reason: reason.into(),
        }
    }
}
