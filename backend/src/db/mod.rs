//! History storage for per-location bloom seasons.
//!
//! Storage is reached through the [`HistoryRepository`] trait so that other
//! backends can be swapped in without touching the services.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Services (HistoricalAggregator, engine)    │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  HistoryRepository trait                    │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  LocalHistoryRepository (in-memory)         │
//! └─────────────────────────────────────────────┘
//! ```

pub mod repositories;
pub mod repository;

pub use repositories::LocalHistoryRepository;
pub use repository::{ErrorContext, HistoryRepository, RepositoryError, RepositoryResult};
