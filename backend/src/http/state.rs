//! Application state for the HTTP server.

use std::sync::Arc;

use crate::services::PhenologyEngine;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Engine answering every phenology query
    pub engine: Arc<PhenologyEngine>,
}

impl AppState {
    /// Create a new application state around an engine.
    pub fn new(engine: Arc<PhenologyEngine>) -> Self {
        Self { engine }
    }
}
