//! The phenology query engine.
//!
//! [`PhenologyEngine`] wires the provider, normalizer, detector, history
//! store, predictor and result cache together behind the query API:
//!
//! ```text
//! get_indices    : fetch → normalize → statistics
//! detect_bloom   : fetch → normalize → detect [→ record season]
//! predict_bloom  : backfill past seasons → detect current season → predict
//! ```
//!
//! Every query validates its coordinates and dates before the provider is
//! contacted, and every point query goes through the result cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use futures::future::try_join_all;
use parking_lot::Mutex;
use serde::Serialize;

use crate::algorithms::{detect, normalize, season_metrics, SeasonMetrics};
use crate::config::EngineConfig;
use crate::db::{HistoryRepository, LocalHistoryRepository};
use crate::error::{PhenologyError, PhenologyResult};
use crate::models::{
    BloomDetection, BloomEvent, DateRange, GeoPoint, HistoricalRecord, IndexKind, LocationKey,
    NoBloomReason, NormalizedSeries, Prediction, SeriesStatistics,
};
use crate::provider::{fetch_with_timeout, ObservationProvider};
use crate::services::cache::{CacheStats, ResultCache};
use crate::services::history::{HistoricalAggregator, HistoryStatistics};
use crate::services::predictor::predict;
use crate::services::regions::{
    classify, grid_points, mean_index, BloomMap, BoundingBox, RegionCell,
};

/// Source of "today" for season boundaries.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in UTC.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock stuck on one date, for tests and replays.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Indices,
    Detection,
    /// `generation` is the location's history generation when the
    /// computation started
    Prediction { years_back: u32, generation: u64 },
    Metrics { year: i32 },
}

/// Cache identity: rounded location, date span, index and operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub location: LocationKey,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub index: IndexKind,
    pub operation: CacheOperation,
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    Indices(IndicesResult),
    Detection(DetectionResult),
    Prediction(PredictionResult),
    Metrics(MetricsResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicesResult {
    pub location: LocationKey,
    pub range: DateRange,
    pub series: NormalizedSeries,
    pub statistics: SeriesStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub location: LocationKey,
    pub range: DateRange,
    pub index: IndexKind,
    pub detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<BloomEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NoBloomReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DetectionResult {
    fn from_outcome(
        location: LocationKey,
        range: DateRange,
        index: IndexKind,
        outcome: BloomDetection,
    ) -> Self {
        match outcome {
            BloomDetection::Detected(event) => Self {
                location,
                range,
                index,
                detected: true,
                event: Some(event),
                reason: None,
                message: None,
            },
            BloomDetection::NotDetected { reason } => Self {
                location,
                range,
                index,
                detected: false,
                event: None,
                reason: Some(reason),
                message: Some(reason.message().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub location: LocationKey,
    pub prediction: Prediction,
    pub history: HistoryStatistics,
    pub seasons: HistoricalRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResult {
    pub location: LocationKey,
    pub year: i32,
    pub metrics: SeasonMetrics,
    pub statistics: SeriesStatistics,
}

/// Liveness of the engine's collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineHealth {
    pub provider: String,
    pub history_store: bool,
    pub cache: CacheStats,
}

pub struct PhenologyEngine {
    config: EngineConfig,
    provider: Arc<dyn ObservationProvider>,
    aggregator: HistoricalAggregator,
    cache: ResultCache<CacheKey, CachedValue>,
    /// Bumped whenever a recorded season can change a location's prediction
    generations: Mutex<HashMap<LocationKey, u64>>,
    clock: Arc<dyn Clock>,
}

/// Builder for [`PhenologyEngine`]. Only the provider is required.
pub struct PhenologyEngineBuilder {
    provider: Arc<dyn ObservationProvider>,
    config: EngineConfig,
    repository: Option<Arc<dyn HistoryRepository>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PhenologyEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn repository(mut self, repository: Arc<dyn HistoryRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> PhenologyResult<PhenologyEngine> {
        self.config.validate()?;
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(LocalHistoryRepository::new()) as Arc<dyn HistoryRepository>);
        let cache = ResultCache::new(
            Duration::from_secs(self.config.cache.ttl_secs),
            self.config.cache.capacity,
        );

        Ok(PhenologyEngine {
            aggregator: HistoricalAggregator::new(repository, self.config.aggregator.clone()),
            cache,
            generations: Mutex::new(HashMap::new()),
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            provider: self.provider,
            config: self.config,
        })
    }
}

impl PhenologyEngine {
    pub fn builder(provider: Arc<dyn ObservationProvider>) -> PhenologyEngineBuilder {
        PhenologyEngineBuilder {
            provider,
            config: EngineConfig::default(),
            repository: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn location_key(&self, point: GeoPoint) -> LocationKey {
        point.key(self.config.location.coordinate_precision)
    }

    fn history_generation(&self, location: LocationKey) -> u64 {
        self.generations.lock().get(&location).copied().unwrap_or(0)
    }

    fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.config.provider.timeout_secs)
    }

    fn query_range(&self, start: NaiveDate, end: NaiveDate) -> PhenologyResult<DateRange> {
        DateRange::new(start, end)?.limit_days(self.config.query.max_range_days)
    }

    async fn normalized_series(
        &self,
        point: GeoPoint,
        range: DateRange,
        index: IndexKind,
    ) -> PhenologyResult<NormalizedSeries> {
        let raw =
            fetch_with_timeout(self.provider.as_ref(), point, range, self.provider_timeout())
                .await?;
        normalize(&raw, index, &range, &self.config.normalizer)
    }

    /// Normalized series and summary statistics for the default index.
    pub async fn get_indices(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PhenologyResult<IndicesResult> {
        self.get_indices_for(lat, lon, start, end, self.config.normalizer.index)
            .await
    }

    pub async fn get_indices_for(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
        index: IndexKind,
    ) -> PhenologyResult<IndicesResult> {
        let point = GeoPoint::new(lat, lon)?;
        let range = self.query_range(start, end)?;
        let location = self.location_key(point);
        log::info!("Indices query for {} {}..{} ({})", location, start, end, index);

        let key = CacheKey {
            location,
            start,
            end,
            index,
            operation: CacheOperation::Indices,
        };
        let value = self
            .cache
            .get_or_compute(key, || async {
                let series = self.normalized_series(point, range, index).await?;
                let statistics = series.statistics();
                Ok::<_, PhenologyError>(CachedValue::Indices(IndicesResult {
                    location,
                    range,
                    series,
                    statistics,
                }))
            })
            .await?;

        match value {
            CachedValue::Indices(result) => Ok(result),
            other => Err(unexpected_cache_value("indices", &other)),
        }
    }

    /// Detect a bloom event in the default index over [start, end].
    ///
    /// When the range lies inside one completed calendar year, the outcome
    /// is stored as that year's season: detected events always, "no bloom"
    /// only when the range spans the whole year.
    pub async fn detect_bloom(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PhenologyResult<DetectionResult> {
        self.detect_bloom_for(lat, lon, start, end, self.config.normalizer.index)
            .await
    }

    pub async fn detect_bloom_for(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
        index: IndexKind,
    ) -> PhenologyResult<DetectionResult> {
        let point = GeoPoint::new(lat, lon)?;
        let range = self.query_range(start, end)?;
        let location = self.location_key(point);
        log::info!("Bloom detection for {} {}..{} ({})", location, start, end, index);

        let key = CacheKey {
            location,
            start,
            end,
            index,
            operation: CacheOperation::Detection,
        };
        let value = self
            .cache
            .get_or_compute(key, || async {
                let series = self.normalized_series(point, range, index).await?;
                let outcome = self.detect_for_location(&series, location, index);
                self.maybe_record_season(location, range, index, &outcome)
                    .await?;
                Ok::<_, PhenologyError>(CachedValue::Detection(DetectionResult::from_outcome(
                    location, range, index, outcome,
                )))
            })
            .await?;

        match value {
            CachedValue::Detection(result) => Ok(result),
            other => Err(unexpected_cache_value("detection", &other)),
        }
    }

    fn detect_for_location(
        &self,
        series: &NormalizedSeries,
        location: LocationKey,
        index: IndexKind,
    ) -> BloomDetection {
        match detect(series, &self.config.detector) {
            BloomDetection::Detected(event) => {
                BloomDetection::Detected(event.with_location(&location, index))
            }
            not_detected => not_detected,
        }
    }

    async fn maybe_record_season(
        &self,
        location: LocationKey,
        range: DateRange,
        index: IndexKind,
        outcome: &BloomDetection,
    ) -> PhenologyResult<()> {
        if index != self.config.normalizer.index {
            return Ok(());
        }
        let Some(year) = range.single_year() else {
            return Ok(());
        };
        if year >= self.today().year() {
            return Ok(());
        }
        let full_year = DateRange::calendar_year(year)? == range;
        if !outcome.is_detected() && !full_year {
            return Ok(());
        }

        self.aggregator
            .record_event(location, year, outcome.clone())
            .await?;
        // Predictions already in flight for the old generation store under
        // a key no later lookup uses
        *self.generations.lock().entry(location).or_insert(0) += 1;
        let dropped = self.cache.invalidate_matching(|k| {
            k.location == location && matches!(k.operation, CacheOperation::Prediction { .. })
        });
        log::debug!(
            "Recorded {} season for {}; dropped {} cached predictions",
            year,
            location,
            dropped
        );
        Ok(())
    }

    /// Predict the next bloom using up to `years_back` past seasons.
    ///
    /// Past seasons missing from history are fetched and detected first.
    pub async fn predict_bloom(
        &self,
        lat: f64,
        lon: f64,
        years_back: Option<u32>,
    ) -> PhenologyResult<PredictionResult> {
        let point = GeoPoint::new(lat, lon)?;
        let years_back = years_back.unwrap_or(self.config.predictor.default_years_back);
        if years_back == 0 || years_back > self.config.predictor.max_years_back {
            return Err(PhenologyError::invalid_request(format!(
                "years_back must be in 1..={}, got {}",
                self.config.predictor.max_years_back, years_back
            )));
        }

        let today = self.today();
        let as_of_year = today.year();
        let first_year = as_of_year - years_back as i32;
        let location = self.location_key(point);
        let index = self.config.normalizer.index;
        log::info!(
            "Bloom prediction for {} using {} seasons before {}",
            location,
            years_back,
            as_of_year
        );

        let season_start = NaiveDate::from_ymd_opt(as_of_year, 1, 1)
            .ok_or_else(|| PhenologyError::internal(format!("invalid year {}", as_of_year)))?;
        let key = CacheKey {
            location,
            start: season_start,
            end: today,
            index,
            operation: CacheOperation::Prediction {
                years_back,
                generation: self.history_generation(location),
            },
        };

        let value = self
            .cache
            .get_or_compute(key, || async {
                self.backfill_seasons(point, location, first_year, as_of_year - 1)
                    .await?;

                let current_range = DateRange::new(season_start, today)?;
                let current = match self.normalized_series(point, current_range, index).await {
                    Ok(series) => Some(self.detect_for_location(&series, location, index)),
                    Err(PhenologyError::InsufficientData { message }) => {
                        log::debug!("No current-season signal for {}: {}", location, message);
                        None
                    }
                    Err(e) => return Err(e),
                };

                let stats = self
                    .aggregator
                    .statistics(location, Some(first_year..=as_of_year - 1))
                    .await?;
                let prediction = predict(
                    &stats,
                    current.as_ref(),
                    as_of_year,
                    point.lat,
                    &self.config.predictor,
                )?;
                let mut seasons = self.aggregator.history(location).await?;
                seasons.seasons.retain(|year, _| *year >= first_year);

                Ok::<_, PhenologyError>(CachedValue::Prediction(PredictionResult {
                    location,
                    prediction,
                    history: stats,
                    seasons,
                }))
            })
            .await?;

        match value {
            CachedValue::Prediction(result) => Ok(result),
            other => Err(unexpected_cache_value("prediction", &other)),
        }
    }

    /// Fetch, detect and store every season in `first..=last` not yet in
    /// history. Years without usable samples are skipped.
    async fn backfill_seasons(
        &self,
        point: GeoPoint,
        location: LocationKey,
        first: i32,
        last: i32,
    ) -> PhenologyResult<usize> {
        let mut missing = Vec::new();
        for year in first..=last {
            if !self.aggregator.has_season(location, year).await? {
                missing.push(year);
            }
        }
        if missing.is_empty() {
            return Ok(0);
        }
        log::info!("Backfilling {} seasons for {}", missing.len(), location);

        let index = self.config.normalizer.index;
        let outcomes = try_join_all(missing.into_iter().map(|year| async move {
            let range = DateRange::calendar_year(year)?;
            match self.normalized_series(point, range, index).await {
                Ok(series) => Ok(Some((year, self.detect_for_location(&series, location, index)))),
                Err(PhenologyError::InsufficientData { message }) => {
                    log::warn!("Skipping season {} for {}: {}", year, location, message);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }))
        .await?;

        let mut recorded = 0;
        for (year, outcome) in outcomes.into_iter().flatten() {
            self.aggregator.record_event(location, year, outcome).await?;
            recorded += 1;
        }
        Ok(recorded)
    }

    /// Green-up, peak and senescence for one calendar year (default: the
    /// current one, up to today).
    pub async fn phenology_metrics(
        &self,
        lat: f64,
        lon: f64,
        year: Option<i32>,
    ) -> PhenologyResult<MetricsResult> {
        let point = GeoPoint::new(lat, lon)?;
        let today = self.today();
        let year = year.unwrap_or(today.year());
        if year > today.year() {
            return Err(PhenologyError::invalid_date_range(format!(
                "year {} is in the future",
                year
            )));
        }

        let full_year = DateRange::calendar_year(year)?;
        let range = if full_year.contains(today) {
            DateRange::new(full_year.start, today)?
        } else {
            full_year
        };
        let location = self.location_key(point);
        let index = self.config.normalizer.index;
        log::info!("Phenology metrics for {} in {}", location, year);

        let key = CacheKey {
            location,
            start: range.start,
            end: range.end,
            index,
            operation: CacheOperation::Metrics { year },
        };
        let value = self
            .cache
            .get_or_compute(key, || async {
                let series = self.normalized_series(point, range, index).await?;
                let metrics = season_metrics(&series, &self.config.metrics)
                    .ok_or_else(|| {
                        PhenologyError::insufficient_data(format!("no samples in {}", year))
                    })?;
                Ok::<_, PhenologyError>(CachedValue::Metrics(MetricsResult {
                    location,
                    year,
                    metrics,
                    statistics: series.statistics(),
                }))
            })
            .await?;

        match value {
            CachedValue::Metrics(result) => Ok(result),
            other => Err(unexpected_cache_value("metrics", &other)),
        }
    }

    /// Recent greenness over a grid covering `bbox`.
    pub async fn bloom_map(&self, bbox: BoundingBox, resolution: f64) -> PhenologyResult<BloomMap> {
        let region = &self.config.region;
        let points = grid_points(&bbox, resolution, region.max_cells_per_axis)?;
        let today = self.today();
        let range = DateRange::new(today - chrono::Duration::days(region.lookback_days), today)?;
        let index = self.config.normalizer.index;
        log::info!("Bloom map over {} grid points", points.len());

        let timeout = self.provider_timeout();
        let samples = try_join_all(points.iter().map(|&point| async move {
            let raw = fetch_with_timeout(self.provider.as_ref(), point, range, timeout).await?;
            Ok::<_, PhenologyError>((point, mean_index(&raw, index)))
        }))
        .await?;

        let mut cells = Vec::with_capacity(samples.len());
        let mut cells_without_data = 0;
        for (point, mean) in samples {
            match mean {
                Some(mean) => cells.push(RegionCell {
                    lat: point.lat,
                    lon: point.lon,
                    mean_index: mean,
                    status: classify(mean, region),
                }),
                None => cells_without_data += 1,
            }
        }

        Ok(BloomMap {
            bbox,
            resolution,
            index,
            as_of: today,
            cells,
            cells_without_data,
        })
    }

    /// Stored seasons for a location.
    pub async fn history(&self, lat: f64, lon: f64) -> PhenologyResult<HistoricalRecord> {
        let point = GeoPoint::new(lat, lon)?;
        self.aggregator.history(self.location_key(point)).await
    }

    pub async fn health(&self) -> EngineHealth {
        EngineHealth {
            provider: self.provider.name().to_string(),
            history_store: self.aggregator.is_healthy().await,
            cache: self.cache.stats(),
        }
    }

    /// Sweep expired cache entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn unexpected_cache_value(expected: &str, found: &CachedValue) -> PhenologyError {
    let found = match found {
        CachedValue::Indices(_) => "indices",
        CachedValue::Detection(_) => "detection",
        CachedValue::Prediction(_) => "prediction",
        CachedValue::Metrics(_) => "metrics",
    };
    PhenologyError::internal(format!(
        "cache returned {} where {} was expected",
        found, expected
    ))
}
