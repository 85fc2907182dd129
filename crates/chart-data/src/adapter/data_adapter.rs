//! Per-chart data adapter: cache, freshness enforcement, retry and failover.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::cache::{CacheStatus, CachedDataset};
use super::diagnostics::FetchDiagnostics;
use crate::clock::{Clock, SystemClock};
use crate::errors::{ChartDataError, RetryClass};
use crate::freshness::Freshness;
use crate::models::{ChartStatus, DataRequirements, DataSourceConfig, DatasetRow};
use crate::parse::parse_rows;
use crate::source::SourceFetcher;

/// Default time-to-live of a cached dataset.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

/// A dataset together with the attempts that produced it.
#[derive(Debug)]
pub struct FetchReport<R> {
    pub dataset: Arc<CachedDataset<R>>,
    pub diagnostics: FetchDiagnostics,
}

impl<R> Clone for FetchReport<R> {
    fn clone(&self) -> Self {
        Self {
            dataset: Arc::clone(&self.dataset),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

type FetchFuture<R> = BoxFuture<'static, Result<FetchReport<R>, ChartDataError>>;

/// Adapter settings that are not part of a chart's requirements.
#[derive(Clone)]
pub struct AdapterConfig {
    /// How long a cached dataset is served without touching the source.
    pub cache_duration: Duration,
    pub clock: Arc<dyn Clock>,
}

impl AdapterConfig {
    pub fn with_cache_duration(mut self, cache_duration: Duration) -> Self {
        self.cache_duration = cache_duration;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            cache_duration: DEFAULT_CACHE_DURATION,
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("cache_duration", &self.cache_duration)
            .finish_non_exhaustive()
    }
}

/// Produces typed rows for one chart type.
///
/// The adapter owns a single [`CachedDataset`] that is swapped atomically on
/// every successful fetch. At most one fetch is in flight at a time: callers
/// arriving while one is running await the same shared future.
///
/// Cloning is cheap and clones share the cache and the in-flight fetch.
pub struct DataAdapter<R: DatasetRow> {
    inner: Arc<AdapterInner<R>>,
}

impl<R: DatasetRow> Clone for DataAdapter<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AdapterInner<R: DatasetRow> {
    chart_type: String,
    requirements: DataRequirements,
    fetcher: Arc<dyn SourceFetcher>,
    config: AdapterConfig,
    cache: ArcSwapOption<CachedDataset<R>>,
    /// Weak handle so the fetch is dropped (and its I/O aborted) once no
    /// caller awaits it any more.
    in_flight: Mutex<Option<WeakShared<FetchFuture<R>>>>,
}

impl<R: DatasetRow> DataAdapter<R> {
    pub fn new(
        chart_type: impl Into<String>,
        requirements: DataRequirements,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self::with_config(chart_type, requirements, fetcher, AdapterConfig::default())
    }

    pub fn with_config(
        chart_type: impl Into<String>,
        requirements: DataRequirements,
        fetcher: Arc<dyn SourceFetcher>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                chart_type: chart_type.into(),
                requirements,
                fetcher,
                config,
                cache: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn chart_type(&self) -> &str {
        &self.inner.chart_type
    }

    pub fn requirements(&self) -> &DataRequirements {
        &self.inner.requirements
    }

    /// The cached dataset, if any, regardless of age.
    pub fn cached(&self) -> Option<Arc<CachedDataset<R>>> {
        self.inner.cache.load_full()
    }

    /// Fetch the chart's rows, serving the cache when it is fresh enough.
    ///
    /// # Arguments
    ///
    /// * `cancel` - Optional token; cancelling it ends this caller's wait
    ///
    /// # Errors
    ///
    /// - [`ChartDataError::DataUnavailable`] when every source failed
    /// - [`ChartDataError::StaleDataBlocked`] when a blocked cache could not be refreshed
    /// - [`ChartDataError::Cancelled`] when `cancel` fired first
    /// - [`ChartDataError::ChartDisabled`] for disabled charts
    pub async fn fetch_data(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Arc<CachedDataset<R>>, ChartDataError> {
        self.fetch_with_diagnostics(cancel)
            .await
            .map(|report| report.dataset)
    }

    /// Like [`fetch_data`](Self::fetch_data), also returning the attempt trail.
    pub async fn fetch_with_diagnostics(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchReport<R>, ChartDataError> {
        self.ensure_fetchable(cancel)?;

        let mut blocked_age = None;
        if let Some(dataset) = self.inner.cache.load_full() {
            let now = self.inner.config.clock.now_epoch_ms();
            let age_hours = dataset.age_hours(now);
            let status = self.inner.requirements.chart_status();
            let refresh_method = self.inner.requirements.primary_source().refresh_method();
            let freshness = self.inner.requirements.freshness();

            if status != ChartStatus::Frozen && freshness.blocks_serving(age_hours, refresh_method)
            {
                warn!(
                    "Cached data for '{}' is {:.1}h old and blocked, forcing refetch",
                    self.inner.chart_type, age_hours
                );
                blocked_age = Some(age_hours);
            } else if status == ChartStatus::Frozen
                || dataset.age_ms(now) < duration_ms(self.inner.config.cache_duration)
            {
                let class = freshness.classify_age(age_hours);
                if class != Freshness::Fresh {
                    warn!(
                        "Serving {} cached data for '{}' ({:.1}h old)",
                        class, self.inner.chart_type, age_hours
                    );
                }
                debug!("Cache hit for '{}'", self.inner.chart_type);
                return Ok(FetchReport {
                    dataset,
                    diagnostics: FetchDiagnostics::cached(),
                });
            }
        }

        let result = self.await_shared(self.join_or_start(), cancel).await;
        match (result, blocked_age) {
            (Err(ChartDataError::DataUnavailable { chart_type, attempts }), Some(age_hours)) => {
                Err(ChartDataError::StaleDataBlocked {
                    chart_type,
                    age_hours,
                    attempts,
                })
            }
            (result, _) => result,
        }
    }

    /// Force a refetch, bypassing the cache.
    ///
    /// Joins a fetch that is already in flight rather than starting another.
    pub async fn refresh(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchReport<R>, ChartDataError> {
        if !self.inner.requirements.refresh().allow_manual_refresh() {
            return Err(ChartDataError::ManualRefreshDisabled(
                self.inner.chart_type.clone(),
            ));
        }
        self.force_refetch(cancel).await
    }

    /// Refetch without the manual-refresh check, used by the background refresher.
    pub(crate) async fn force_refetch(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchReport<R>, ChartDataError> {
        self.ensure_fetchable(cancel)?;
        self.await_shared(self.join_or_start(), cancel).await
    }

    /// Drop the cached dataset. The next fetch goes to the sources.
    pub fn invalidate(&self) {
        if self.inner.cache.swap(None).is_some() {
            debug!("Invalidated cache for '{}'", self.inner.chart_type);
        }
    }

    /// Row count, age and freshness of the cached dataset.
    pub fn cache_status(&self) -> Option<CacheStatus> {
        let now = self.inner.config.clock.now_epoch_ms();
        self.inner
            .cache
            .load()
            .as_ref()
            .map(|dataset| dataset.status(now, self.inner.requirements.freshness()))
    }

    fn ensure_fetchable(&self, cancel: Option<&CancellationToken>) -> Result<(), ChartDataError> {
        if self.inner.requirements.chart_status() == ChartStatus::Disabled {
            return Err(ChartDataError::ChartDisabled(self.inner.chart_type.clone()));
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(ChartDataError::Cancelled);
        }
        Ok(())
    }

    /// Return the in-flight fetch, or start a new one.
    fn join_or_start(&self) -> Shared<FetchFuture<R>> {
        let mut slot = self.inner.lock_in_flight();

        if let Some(existing) = slot.as_ref().and_then(WeakShared::upgrade) {
            if existing.peek().is_none() {
                debug!("Joining in-flight fetch for '{}'", self.inner.chart_type);
                return existing;
            }
        }

        let inner = Arc::clone(&self.inner);
        let future: FetchFuture<R> = async move { inner.fetch_from_sources().await }.boxed();
        let shared = future.shared();
        *slot = shared.downgrade();
        shared
    }

    async fn await_shared(
        &self,
        shared: Shared<FetchFuture<R>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchReport<R>, ChartDataError> {
        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Fetch for '{}' cancelled by caller", self.inner.chart_type);
                        Err(ChartDataError::Cancelled)
                    }
                    result = shared => result,
                }
            }
            None => shared.await,
        }
    }
}

impl<R: DatasetRow> AdapterInner<R> {
    fn lock_in_flight(&self) -> MutexGuard<'_, Option<WeakShared<FetchFuture<R>>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| {
            warn!(
                "In-flight slot mutex for '{}' was poisoned, recovering",
                self.chart_type
            );
            poisoned.into_inner()
        })
    }

    /// Walk `[primary, ...fallbacks]`, retrying each per the refresh policy.
    async fn fetch_from_sources(self: Arc<Self>) -> Result<FetchReport<R>, ChartDataError> {
        let refresh = self.requirements.refresh();
        let max_attempts = refresh.max_retries().saturating_add(1);
        let mut diagnostics = FetchDiagnostics::new();

        for (index, source) in self.requirements.sources().enumerate() {
            if index > 0 {
                info!(
                    "Falling back to source #{} '{}' for '{}'",
                    index,
                    source.location(),
                    self.chart_type
                );
            }

            for attempt in 1..=max_attempts {
                let delay_ms = if attempt > 1 {
                    let delay = refresh.retry_delay(attempt - 1);
                    debug!(
                        "Retrying '{}' for '{}' in {:?} (attempt {}/{})",
                        source.location(),
                        self.chart_type,
                        delay,
                        attempt,
                        max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
                } else {
                    None
                };

                match self.fetch_source(source).await {
                    Ok(rows) => {
                        let row_count = rows.len();
                        let dataset = Arc::new(CachedDataset {
                            rows,
                            fetched_at_epoch_ms: self.config.clock.now_epoch_ms(),
                            source: source.location().to_string(),
                        });
                        self.cache.store(Some(Arc::clone(&dataset)));
                        diagnostics.record_success(
                            source.location(),
                            index,
                            attempt,
                            delay_ms,
                            row_count,
                        );

                        info!(
                            "Fetched {} rows for '{}' from '{}'",
                            row_count,
                            self.chart_type,
                            source.location()
                        );
                        return Ok(FetchReport {
                            dataset,
                            diagnostics,
                        });
                    }
                    Err(e) => {
                        warn!(
                            "Source '{}' failed for '{}' (attempt {}/{}): {}",
                            source.location(),
                            self.chart_type,
                            attempt,
                            max_attempts,
                            e
                        );
                        diagnostics.record_failure(
                            source.location(),
                            index,
                            attempt,
                            delay_ms,
                            e.to_string(),
                        );

                        match e.retry_class() {
                            RetryClass::Retry => continue,
                            RetryClass::NextSource => break,
                            RetryClass::Never => return Err(e),
                        }
                    }
                }
            }
        }

        warn!(
            "All sources exhausted for '{}': {}",
            self.chart_type,
            diagnostics.summary()
        );
        Err(ChartDataError::DataUnavailable {
            chart_type: self.chart_type.clone(),
            attempts: diagnostics.attempts,
        })
    }

    async fn fetch_source(&self, source: &DataSourceConfig) -> Result<Vec<R>, ChartDataError> {
        let payload = self.fetcher.fetch(source).await?;
        parse_rows(&payload, source.format(), source.location())
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
