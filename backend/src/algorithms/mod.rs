//! Pure signal processing over vegetation index series.
//!
//! Nothing in here performs I/O or holds shared state; every function takes
//! its inputs and thresholds explicitly so it can be tested in isolation.

pub mod circular;
pub mod detector;
pub mod metrics;
pub mod normalizer;

pub use circular::{circular_distance, circular_summary, CircularSummary};
pub use detector::detect;
pub use metrics::{season_metrics, PhenologyStage, SeasonMetrics, StageSample};
pub use normalizer::{moving_average, normalize};
