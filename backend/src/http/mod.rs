//! HTTP server module for the phenology engine.
//!
//! This module provides an axum-based HTTP server that exposes the
//! [`PhenologyEngine`](crate::services::PhenologyEngine) as a REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Request parsing                                        │
//! │  - JSON serialization/deserialization                     │
//! │  - CORS, compression, error mapping                       │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Engine (services/engine.rs)                              │
//! │  - Validation, result cache                               │
//! │  - normalize → detect → aggregate → predict               │
//! └─────────┬─────────────────────────────────┬──────────────┘
//!           │                                 │
//! ┌─────────▼──────────────────┐   ┌──────────▼──────────────┐
//! │  Observation provider      │   │  History repository      │
//! │  (provider/)               │   │  (db/)                   │
//! └────────────────────────────┘   └──────────────────────────┘
//! ```

#[cfg(feature = "http-server")]
pub mod dto;

#[cfg(feature = "http-server")]
pub mod handlers;

#[cfg(feature = "http-server")]
pub mod router;

#[cfg(feature = "http-server")]
pub mod state;

#[cfg(feature = "http-server")]
pub mod error;

#[cfg(feature = "http-server")]
pub use router::create_router;
#[cfg(feature = "http-server")]
pub use state::AppState;
