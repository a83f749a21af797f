//! Repository implementations module.
//!
//! - `local`: In-memory implementation for tests and single-node deployments

pub mod local;

pub use local::LocalHistoryRepository;
