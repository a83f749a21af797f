//! Engine configuration file support.
//!
//! Every threshold the pipeline uses lives here. All fields have defaults, so
//! an empty `bloomwatch.toml` (or no file at all) yields a working engine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PhenologyError, PhenologyResult};
use crate::models::IndexKind;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "BLOOMWATCH_CONFIG";

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub region: RegionConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// Resampling and smoothing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Grid spacing in days (8 matches the usual MODIS composite)
    #[serde(default = "default_cadence_days")]
    pub cadence_days: u32,
    /// Centered moving-average width; 1 disables smoothing
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default)]
    pub index: IndexKind,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            cadence_days: default_cadence_days(),
            smoothing_window: default_smoothing_window(),
            index: IndexKind::default(),
        }
    }
}

/// Detector thresholds, all in unit-scale ([0, 1]) values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_baseline_window")]
    pub baseline_window: usize,
    /// Fraction in [0, 1]; 0 takes the minimum
    #[serde(default = "default_baseline_percentile")]
    pub baseline_percentile: f64,
    #[serde(default = "default_onset_threshold")]
    pub onset_threshold: f64,
    #[serde(default = "default_peak_prominence")]
    pub peak_prominence: f64,
    #[serde(default = "default_expected_dynamic_range")]
    pub expected_dynamic_range: f64,
    #[serde(default = "default_plausible_min_days")]
    pub plausible_min_days: i64,
    #[serde(default = "default_plausible_max_days")]
    pub plausible_max_days: i64,
    #[serde(default = "default_duration_decay_days")]
    pub duration_decay_days: i64,
    #[serde(default = "default_magnitude_weight")]
    pub magnitude_weight: f64,
    #[serde(default = "default_quality_weight")]
    pub quality_weight: f64,
    #[serde(default = "default_duration_weight")]
    pub duration_weight: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            baseline_window: default_baseline_window(),
            baseline_percentile: default_baseline_percentile(),
            onset_threshold: default_onset_threshold(),
            peak_prominence: default_peak_prominence(),
            expected_dynamic_range: default_expected_dynamic_range(),
            plausible_min_days: default_plausible_min_days(),
            plausible_max_days: default_plausible_max_days(),
            duration_decay_days: default_duration_decay_days(),
            magnitude_weight: default_magnitude_weight(),
            quality_weight: default_quality_weight(),
            duration_weight: default_duration_weight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Seasons of data below which statistics are flagged low confidence
    #[serde(default = "default_min_years")]
    pub min_years: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_years: default_min_years(),
        }
    }
}

/// Prediction window and labelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_window_k")]
    pub window_k: f64,
    #[serde(default = "default_max_window_days")]
    pub max_window_days: f64,
    #[serde(default = "default_fallback_stddev_days")]
    pub fallback_stddev_days: f64,
    #[serde(default = "default_high_min_years")]
    pub high_min_years: usize,
    #[serde(default = "default_high_max_stddev_days")]
    pub high_max_stddev_days: f64,
    #[serde(default = "default_medium_min_years")]
    pub medium_min_years: usize,
    #[serde(default = "default_years_back")]
    pub default_years_back: u32,
    #[serde(default = "default_max_years_back")]
    pub max_years_back: u32,
    /// Climatological onset day at the equator, used without any onset
    #[serde(default = "default_climatology_onset_doy")]
    pub climatology_onset_doy: f64,
    /// Days added to the climatological onset per 90 degrees of latitude
    #[serde(default = "default_climatology_latitude_shift_days")]
    pub climatology_latitude_shift_days: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            window_k: default_window_k(),
            max_window_days: default_max_window_days(),
            fallback_stddev_days: default_fallback_stddev_days(),
            high_min_years: default_high_min_years(),
            high_max_stddev_days: default_high_max_stddev_days(),
            medium_min_years: default_medium_min_years(),
            default_years_back: default_years_back(),
            max_years_back: default_max_years_back(),
            climatology_onset_doy: default_climatology_onset_doy(),
            climatology_latitude_shift_days: default_climatology_latitude_shift_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Decimal places kept when keying history and cache entries
    #[serde(default = "default_coordinate_precision")]
    pub coordinate_precision: u8,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            coordinate_precision: default_coordinate_precision(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Native index value marking green-up and senescence
    #[serde(default = "default_season_threshold")]
    pub season_threshold: f64,
    #[serde(default)]
    pub stages: StageThresholds,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            season_threshold: default_season_threshold(),
            stages: StageThresholds::default(),
        }
    }
}

/// Lower native bounds of each growth stage; below `early_greenup` is
/// dormant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageThresholds {
    #[serde(default = "default_stage_early_greenup")]
    pub early_greenup: f64,
    #[serde(default = "default_stage_greenup")]
    pub greenup: f64,
    #[serde(default = "default_stage_peak_green")]
    pub peak_green: f64,
    #[serde(default = "default_stage_blooming")]
    pub blooming: f64,
    #[serde(default = "default_stage_mature")]
    pub mature: f64,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            early_greenup: default_stage_early_greenup(),
            greenup: default_stage_greenup(),
            peak_green: default_stage_peak_green(),
            blooming: default_stage_blooming(),
            mature: default_stage_mature(),
        }
    }
}

impl StageThresholds {
    fn is_ascending(&self) -> bool {
        let cuts = [
            self.early_greenup,
            self.greenup,
            self.peak_green,
            self.blooming,
            self.mature,
        ];
        cuts.windows(2).all(|w| w[0] < w[1])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_bloom_threshold")]
    pub bloom_threshold: f64,
    #[serde(default = "default_vegetated_threshold")]
    pub vegetated_threshold: f64,
    #[serde(default = "default_max_cells_per_axis")]
    pub max_cells_per_axis: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            bloom_threshold: default_bloom_threshold(),
            vegetated_threshold: default_vegetated_threshold(),
            max_cells_per_axis: default_max_cells_per_axis(),
        }
    }
}

/// Limits on what a single query may ask for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Longest accepted date range, in days (inclusive of both ends)
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_range_days: default_max_range_days(),
        }
    }
}

fn default_cadence_days() -> u32 {
    8
}

fn default_smoothing_window() -> usize {
    3
}

fn default_baseline_window() -> usize {
    3
}

fn default_baseline_percentile() -> f64 {
    0.1
}

fn default_onset_threshold() -> f64 {
    0.1
}

fn default_peak_prominence() -> f64 {
    0.05
}

fn default_expected_dynamic_range() -> f64 {
    0.3
}

fn default_plausible_min_days() -> i64 {
    10
}

fn default_plausible_max_days() -> i64 {
    120
}

fn default_duration_decay_days() -> i64 {
    60
}

fn default_magnitude_weight() -> f64 {
    0.5
}

fn default_quality_weight() -> f64 {
    0.3
}

fn default_duration_weight() -> f64 {
    0.2
}

fn default_min_years() -> usize {
    2
}

fn default_window_k() -> f64 {
    1.5
}

fn default_max_window_days() -> f64 {
    60.0
}

fn default_fallback_stddev_days() -> f64 {
    7.0
}

fn default_high_min_years() -> usize {
    4
}

fn default_high_max_stddev_days() -> f64 {
    10.0
}

fn default_medium_min_years() -> usize {
    2
}

fn default_years_back() -> u32 {
    5
}

fn default_max_years_back() -> u32 {
    30
}

fn default_climatology_onset_doy() -> f64 {
    100.0
}

fn default_climatology_latitude_shift_days() -> f64 {
    30.0
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_capacity() -> usize {
    1024
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_coordinate_precision() -> u8 {
    2
}

fn default_season_threshold() -> f64 {
    0.4
}

fn default_stage_early_greenup() -> f64 {
    0.2
}

fn default_stage_greenup() -> f64 {
    0.4
}

fn default_stage_peak_green() -> f64 {
    0.6
}

fn default_stage_blooming() -> f64 {
    0.75
}

fn default_stage_mature() -> f64 {
    0.85
}

fn default_max_range_days() -> i64 {
    // Ten years, leap days included
    3653
}

fn default_lookback_days() -> i64 {
    16
}

fn default_bloom_threshold() -> f64 {
    0.6
}

fn default_vegetated_threshold() -> f64 {
    0.3
}

fn default_max_cells_per_axis() -> usize {
    10
}

impl EngineConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PhenologyResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PhenologyError::configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            PhenologyError::configuration(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `bloomwatch.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> PhenologyResult<Self> {
        let search_paths = [
            PathBuf::from("bloomwatch.toml"),
            PathBuf::from("backend/bloomwatch.toml"),
            PathBuf::from("../bloomwatch.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(PhenologyError::configuration(
            "No bloomwatch.toml found in standard locations",
        ))
    }

    /// Resolve configuration for the server.
    ///
    /// `BLOOMWATCH_CONFIG` wins when set (and must load). Otherwise the
    /// default locations are searched, and built-in defaults are used when
    /// no file exists.
    pub fn from_env_or_default() -> PhenologyResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                log::info!("Loading engine configuration from {}", path);
                return Self::from_file(path.trim());
            }
        }

        match Self::from_default_location() {
            Ok(config) => Ok(config),
            Err(PhenologyError::Configuration { message }) if message.starts_with("No ") => {
                log::debug!("{}; using built-in defaults", message);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Reject settings no pipeline stage can work with.
    pub fn validate(&self) -> PhenologyResult<()> {
        let n = &self.normalizer;
        if n.cadence_days == 0 {
            return Err(PhenologyError::configuration(
                "normalizer.cadence_days must be at least 1",
            ));
        }
        if n.smoothing_window == 0 {
            return Err(PhenologyError::configuration(
                "normalizer.smoothing_window must be at least 1",
            ));
        }

        let d = &self.detector;
        if d.baseline_window == 0 {
            return Err(PhenologyError::configuration(
                "detector.baseline_window must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&d.baseline_percentile) {
            return Err(PhenologyError::configuration(
                "detector.baseline_percentile must be in [0, 1]",
            ));
        }
        if d.onset_threshold <= 0.0 || d.peak_prominence <= 0.0 {
            return Err(PhenologyError::configuration(
                "detector.onset_threshold and detector.peak_prominence must be positive",
            ));
        }
        if d.expected_dynamic_range <= 0.0 {
            return Err(PhenologyError::configuration(
                "detector.expected_dynamic_range must be positive",
            ));
        }
        if d.plausible_min_days > d.plausible_max_days {
            return Err(PhenologyError::configuration(format!(
                "detector.plausible_min_days ({}) exceeds plausible_max_days ({})",
                d.plausible_min_days, d.plausible_max_days
            )));
        }
        let weights = [d.magnitude_weight, d.quality_weight, d.duration_weight];
        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(PhenologyError::configuration(
                "detector confidence weights must be non-negative and not all zero",
            ));
        }

        let p = &self.predictor;
        if p.window_k <= 0.0 || p.max_window_days <= 0.0 || p.fallback_stddev_days <= 0.0 {
            return Err(PhenologyError::configuration(
                "predictor window settings must be positive",
            ));
        }
        if p.default_years_back == 0 || p.default_years_back > p.max_years_back {
            return Err(PhenologyError::configuration(format!(
                "predictor.default_years_back must be in 1..={}",
                p.max_years_back
            )));
        }
        if !(1.0..=366.0).contains(&p.climatology_onset_doy) {
            return Err(PhenologyError::configuration(
                "predictor.climatology_onset_doy must be in [1, 366]",
            ));
        }

        if self.cache.capacity == 0 {
            return Err(PhenologyError::configuration(
                "cache.capacity must be at least 1",
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(PhenologyError::configuration(
                "provider.timeout_secs must be at least 1",
            ));
        }
        if self.location.coordinate_precision > 6 {
            return Err(PhenologyError::configuration(
                "location.coordinate_precision must be at most 6",
            ));
        }
        if self.region.max_cells_per_axis == 0 || self.region.lookback_days <= 0 {
            return Err(PhenologyError::configuration(
                "region.max_cells_per_axis and region.lookback_days must be positive",
            ));
        }
        if !self.metrics.stages.is_ascending() {
            return Err(PhenologyError::configuration(
                "metrics.stages thresholds must be strictly ascending",
            ));
        }
        if self.query.max_range_days < 366 {
            return Err(PhenologyError::configuration(
                "query.max_range_days must cover at least one calendar year (366)",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.normalizer.cadence_days, 8);
        assert_eq!(config.detector.baseline_window, 3);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.predictor.default_years_back, 5);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[normalizer]
cadence_days = 16
index = "evi"

[detector]
onset_threshold = 0.15
"#;

        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.normalizer.cadence_days, 16);
        assert_eq!(config.normalizer.index, IndexKind::Evi);
        assert_eq!(config.normalizer.smoothing_window, 3);
        assert_eq!(config.detector.onset_threshold, 0.15);
        assert_eq!(config.detector.peak_prominence, 0.05);
        assert_eq!(config.cache.capacity, 1024);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_cadence() {
        let mut config = EngineConfig::default();
        config.normalizer.cadence_days = 0;
        assert!(matches!(
            config.validate(),
            Err(PhenologyError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_percentile() {
        let mut config = EngineConfig::default();
        config.detector.baseline_percentile = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unordered_stages() {
        let mut config = EngineConfig::default();
        config.metrics.stages.blooming = 0.5;
        assert!(matches!(
            config.validate(),
            Err(PhenologyError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_short_query_span() {
        let mut config = EngineConfig::default();
        config.query.max_range_days = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_years_back_over_max() {
        let mut config = EngineConfig::default();
        config.predictor.default_years_back = 40;
        assert!(config.validate().is_err());
    }
}
