//! # BloomWatch
//!
//! Phenology signal engine for satellite vegetation index time series.
//!
//! This crate ingests per-date vegetation index observations (NDVI/EVI) for a
//! geographic point and answers two questions: did a flowering event occur in
//! a window, and when will the next one occur. The backend exposes a REST API
//! via Axum for the presentation layer.
//!
//! ## Features
//!
//! - **Normalization**: Resample irregular, cloud-contaminated observations onto a
//!   fixed cadence grid with gap filling and edge-aware smoothing
//! - **Detection**: Onset/peak/decline state machine with a weighted confidence score
//! - **History**: Per-location season records with circular day-of-year statistics
//! - **Prediction**: Next-bloom date with a confidence window and label
//! - **Caching**: Single-flight, LRU + TTL memoization at the query boundary
//! - **HTTP API**: RESTful endpoints for frontend integration
//!
//! ## Architecture
//!
//! - [`models`]: Domain types (observations, series, bloom events, predictions)
//! - [`algorithms`]: Pure signal processing (normalizer, detector, circular statistics)
//! - [`provider`]: Observation provider boundary and implementations
//! - [`db`]: History repository pattern and in-memory store
//! - [`services`]: Aggregation, prediction, caching and the query engine
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! ```text
//! raw observations → normalizer → detector → {current season, history} → predictor
//!                         (result cache wraps the whole pipeline)
//! ```

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod provider;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use config::EngineConfig;
pub use error::{LowConfidence, PhenologyError, PhenologyResult};
pub use services::engine::PhenologyEngine;
