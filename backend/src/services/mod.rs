//! Service layer for business logic and orchestration.
//!
//! Services sit between the HTTP layer and the pure algorithms: they own
//! the history store, the provider handle and the result cache.

pub mod cache;
pub mod engine;
pub mod history;
pub mod predictor;
pub mod regions;

pub use cache::{CacheStats, ResultCache};
pub use engine::{
    CacheKey, CacheOperation, Clock, DetectionResult, EngineHealth, FixedClock, IndicesResult,
    MetricsResult, PhenologyEngine, PhenologyEngineBuilder, PredictionResult, SystemClock,
};
pub use history::{compute_statistics, HistoricalAggregator, HistoryStatistics};
pub use predictor::{confidence_label, predict};
pub use regions::{BloomMap, BoundingBox, CellStatus, RegionCell};
