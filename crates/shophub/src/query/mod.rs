//! Data-fetch cache
//!
//! [`QueryClient`] memoizes asynchronous fetch results by [`QueryKey`]. Fresh
//! entries are served without touching the source, stale entries are served
//! while a single background refetch runs, and concurrent fetches for the same
//! key collapse into one call.

use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use shophub_core::{
    EvictionReason, JsonSerializer, NoopMetrics, QueryEntry, QueryKey, QueryMetrics,
    QueryOperation, QueryOptions, QueryResult, QueryStats, QueryStatus, Result, RetryPolicy,
    Serializer, ShopError,
};

mod coalescer;
use coalescer::Coalescer;

mod infinite;
pub use infinite::InfiniteQuery;

mod observer;
pub use observer::QueryObserver;

/// Type-erased fetch function. Receives the entry's current payload so
/// multi-page queries know how many pages to refetch.
type Fetcher = Arc<dyn Fn(Option<Vec<u8>>) -> BoxFuture<'static, Result<Vec<u8>>> + Send + Sync>;

/// Configuration for QueryClient
#[derive(Debug, Clone)]
pub struct QueryClientConfig {
    /// How long fetched data counts as fresh
    pub stale_time: Duration,
    /// How long an unobserved entry is kept before collection
    pub gc_time: Duration,
    /// Retry policy applied around every fetch
    pub retry: RetryPolicy,
}

impl Default for QueryClientConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryClientConfig {
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fail on the first error
    pub fn no_retry(self) -> Self {
        self.with_retry(RetryPolicy::none())
    }
}

/// Snapshot of an entry's bookkeeping, without its payload
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub status: QueryStatus,
    pub error: Option<ShopError>,
    pub has_data: bool,
    pub updated_at: Option<Instant>,
    pub stale_at: Option<Instant>,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub invalidated: bool,
    pub failure_count: u32,
    pub fetch_count: u64,
    pub observers: usize,
}

/// Options with client defaults filled in
#[derive(Debug, Clone)]
struct Resolved {
    stale_time: Duration,
    gc_time: Duration,
    retry: RetryPolicy,
    initial_page: u32,
}

struct Slot {
    entry: QueryEntry<Vec<u8>>,
    gc_time: Duration,
    retry: RetryPolicy,
    fetcher: Option<Fetcher>,
    observers: usize,
    last_active: Instant,
    version: watch::Sender<u64>,
}

impl Slot {
    fn new(options: &Resolved) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            entry: QueryEntry::pending(options.stale_time),
            gc_time: options.gc_time,
            retry: options.retry.clone(),
            fetcher: None,
            observers: 0,
            last_active: Instant::now(),
            version,
        }
    }

    fn apply(&mut self, options: &Resolved) {
        self.entry.stale_time = options.stale_time;
        self.gc_time = options.gc_time;
        self.retry = options.retry.clone();
        self.last_active = Instant::now();
    }

    fn notify(&self) {
        self.version.send_modify(|version| *version += 1);
    }

    fn is_collectable(&self, now: Instant) -> bool {
        self.observers == 0 && now >= self.last_active + self.gc_time
    }
}

/// Keyed cache of asynchronous query results
///
/// Generic over:
/// - `S`: how payloads are encoded inside entries
/// - `M`: the metrics collector
///
/// Cloning yields another handle to the same cache.
pub struct QueryClient<S = JsonSerializer, M = NoopMetrics>
where
    S: Serializer,
    M: QueryMetrics,
{
    entries: Arc<DashMap<QueryKey, Slot>>,
    serializer: Arc<S>,
    metrics: Arc<M>,
    stats: Arc<RwLock<QueryStats>>,
    config: QueryClientConfig,
    coalescer: Coalescer,
}

impl QueryClient<JsonSerializer, NoopMetrics> {
    /// Create a client with default configuration
    pub fn new() -> Self {
        Self::with_config(QueryClientConfig::default())
    }

    pub fn with_config(config: QueryClientConfig) -> Self {
        Self::with_serializer_and_metrics(JsonSerializer, NoopMetrics, config)
    }
}

impl Default for QueryClient<JsonSerializer, NoopMetrics> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> QueryClient<S, M>
where
    S: Serializer,
    M: QueryMetrics,
{
    /// Create a client with a custom serializer and metrics
    pub fn with_serializer_and_metrics(
        serializer: S,
        metrics: M,
        config: QueryClientConfig,
    ) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            serializer: Arc::new(serializer),
            metrics: Arc::new(metrics),
            stats: Arc::new(RwLock::new(QueryStats::default())),
            config,
            coalescer: Coalescer::new(),
        }
    }

    pub fn config(&self) -> &QueryClientConfig {
        &self.config
    }

    /// Return the data for `key`, fetching it when absent.
    ///
    /// Fresh data resolves as [`QueryResult::Hit`]. Stale data resolves as
    /// [`QueryResult::Stale`] immediately and schedules one background refetch.
    /// Absent data is fetched (with retries), or joined if another caller is
    /// already fetching it, and resolves as [`QueryResult::Fetched`].
    pub async fn query<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
        options: impl Into<QueryOptions>,
    ) -> Result<QueryResult<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let options = self.resolve(&options.into());
        let fetcher = self.erase(fetch);
        let result = self.lookup(&key, fetcher, &options).await?;
        Ok(match result {
            QueryResult::Hit(bytes) => QueryResult::Hit(self.serializer.deserialize(&bytes)?),
            QueryResult::Stale(bytes) => QueryResult::Stale(self.serializer.deserialize(&bytes)?),
            QueryResult::Fetched(bytes) => {
                QueryResult::Fetched(self.serializer.deserialize(&bytes)?)
            }
        })
    }

    /// Populate `key` ahead of use. Fresh entries are left alone; failures are
    /// logged and swallowed.
    pub async fn prefetch<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
        options: impl Into<QueryOptions>,
    ) where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let options = self.resolve(&options.into());
        let fetcher = self.erase(fetch);
        self.prefetch_erased(&key, fetcher, &options).await;
    }

    /// Mark every entry under `prefix` stale. Observed entries refetch right
    /// away; the rest refetch on their next query or observation.
    ///
    /// A fetch already in flight for a marked key cannot clear the mark: its
    /// result is stored as stale, and the key is fetched again once it lands.
    ///
    /// Returns the number of entries marked.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let start = Instant::now();
        let mut marked = 0;
        let mut refetch = Vec::new();

        for mut slot in self.entries.iter_mut() {
            if !slot.key().starts_with(prefix) {
                continue;
            }
            let key = slot.key().clone();
            slot.entry.invalidate();
            slot.notify();
            marked += 1;
            // An in-flight fetch refetches on completion instead
            if slot.observers > 0 && slot.fetcher.is_some() && !self.coalescer.is_inflight(&key) {
                refetch.push(key);
            }
        }

        for key in &refetch {
            self.spawn_refetch(key);
        }

        debug!(prefix = %prefix, marked, refetching = refetch.len(), "invalidated queries");
        self.metrics
            .record_latency(QueryOperation::Invalidate, start.elapsed());
        marked
    }

    /// Refetch every observed entry that has gone stale, as on regaining focus
    /// or reconnecting. Returns the number of refetches started.
    pub fn refetch_active(&self) -> usize {
        let stale: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|slot| slot.observers > 0 && slot.fetcher.is_some() && slot.entry.is_stale())
            .map(|slot| slot.key().clone())
            .collect();

        stale
            .iter()
            .filter(|key| self.spawn_refetch(key))
            .count()
    }

    /// Drop every entry unconditionally
    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        for _ in 0..dropped {
            self.metrics.record_eviction(EvictionReason::Cleared);
        }
        self.metrics.record_size(0);
        debug!(dropped, "query cache cleared");
    }

    /// Drop a single entry
    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.metrics.record_eviction(EvictionReason::Removed);
            self.metrics.record_size(self.entries.len());
        }
        removed
    }

    /// Cached data for `key`, regardless of freshness
    pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>> {
        let bytes = self
            .entries
            .get(key)
            .and_then(|slot| slot.entry.data.clone());
        bytes
            .map(|bytes| self.serializer.deserialize(&bytes))
            .transpose()
    }

    /// Write data for `key` as if it had just been fetched
    pub fn set_query_data<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<()> {
        let bytes = self.serializer.serialize(value)?;
        let defaults = self.resolve(&QueryOptions::default());
        let mut slot = self
            .entries
            .entry(key)
            .or_insert_with(|| Slot::new(&defaults));
        slot.entry.set_data(bytes);
        slot.last_active = Instant::now();
        slot.notify();
        Ok(())
    }

    /// Bookkeeping for `key`, if it has an entry
    pub fn query_state(&self, key: &QueryKey) -> Option<QueryState> {
        let slot = self.entries.get(key)?;
        Some(QueryState {
            status: slot.entry.status,
            error: slot.entry.error.clone(),
            has_data: slot.entry.data.is_some(),
            updated_at: slot.entry.updated_at,
            stale_at: slot.entry.stale_at(),
            is_stale: slot.entry.is_stale(),
            is_fetching: self.is_fetching(key),
            invalidated: slot.entry.invalidated,
            failure_count: slot.entry.failure_count,
            fetch_count: slot.entry.fetch_count,
            observers: slot.observers,
        })
    }

    /// Whether a foreground or background fetch for `key` is running
    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.coalescer.is_inflight(key) || self.coalescer.is_refreshing(key)
    }

    /// Register an observer for `key`.
    ///
    /// While at least one observer is alive the entry is never collected, and
    /// invalidation refetches it immediately. Observing a stale entry whose
    /// fetch function is known triggers a background refetch.
    pub fn observe(&self, key: QueryKey) -> QueryObserver<S, M> {
        let defaults = self.resolve(&QueryOptions::default());
        let (version, refetch) = {
            let mut slot = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Slot::new(&defaults));
            slot.observers += 1;
            slot.last_active = Instant::now();
            (
                slot.version.subscribe(),
                slot.fetcher.is_some() && slot.entry.is_stale(),
            )
        };
        if refetch {
            self.spawn_refetch(&key);
        }
        QueryObserver::new(self.clone(), key, version)
    }

    fn unobserve(&self, key: &QueryKey) {
        if let Some(mut slot) = self.entries.get_mut(key) {
            slot.observers = slot.observers.saturating_sub(1);
            slot.last_active = Instant::now();
        }
    }

    /// Evict entries that have been unobserved for longer than their gc window
    pub fn collect_garbage(&self) -> usize {
        let start = Instant::now();
        let now = Instant::now();
        let mut evicted = 0;

        self.entries.retain(|key, slot| {
            let keep = !slot.is_collectable(now) || self.coalescer.is_inflight(key);
            if !keep {
                debug!(key = %key, "evicting unobserved query");
                self.metrics.record_eviction(EvictionReason::Unobserved);
                evicted += 1;
            }
            keep
        });

        if evicted > 0 {
            self.stats.write().evictions += evicted as u64;
        }
        self.metrics.record_size(self.entries.len());
        self.metrics
            .record_latency(QueryOperation::Collect, start.elapsed());
        evicted
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `every`.
    ///
    /// Must be called from within a Tokio runtime. Abort the returned handle
    /// to stop collecting.
    pub fn spawn_gc(&self, every: Duration) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                client.collect_garbage();
            }
        })
    }

    /// Counters plus the current entry count
    pub fn stats(&self) -> QueryStats {
        let mut stats = self.stats.read().clone();
        stats.entries = self.entries.len();
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all entries
    pub fn keys(&self) -> Vec<QueryKey> {
        self.entries.iter().map(|slot| slot.key().clone()).collect()
    }

    fn resolve(&self, options: &QueryOptions) -> Resolved {
        Resolved {
            stale_time: options.stale_time.unwrap_or(self.config.stale_time),
            gc_time: options.gc_time.unwrap_or(self.config.gc_time),
            retry: options
                .retry
                .clone()
                .unwrap_or_else(|| self.config.retry.clone()),
            initial_page: options.initial_page_param,
        }
    }

    fn erase<T, F, Fut>(&self, fetch: F) -> Fetcher
    where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let serializer = self.serializer.clone();
        Arc::new(move |_previous| {
            let pending = fetch();
            let serializer = serializer.clone();
            async move {
                let value = pending.await?;
                serializer.serialize(&value)
            }
            .boxed()
        })
    }

    /// Register `fetcher` under `key` and resolve the entry's bytes
    async fn lookup(
        &self,
        key: &QueryKey,
        fetcher: Fetcher,
        options: &Resolved,
    ) -> Result<QueryResult<Vec<u8>>> {
        let start = Instant::now();
        let label = key.to_string();

        let cached = {
            let mut slot = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Slot::new(options));
            slot.apply(options);
            slot.fetcher = Some(fetcher);
            slot.entry
                .data
                .clone()
                .map(|bytes| (bytes, slot.entry.is_stale()))
        };

        let result = match cached {
            Some((bytes, false)) => {
                self.metrics.record_hit(&label);
                self.stats.write().hits += 1;
                QueryResult::Hit(bytes)
            }
            Some((bytes, true)) => {
                self.metrics.record_stale_hit(&label);
                self.stats.write().stale_hits += 1;
                self.spawn_refetch(key);
                QueryResult::Stale(bytes)
            }
            None => {
                self.metrics.record_miss(&label);
                self.stats.write().misses += 1;
                QueryResult::Fetched(self.fetch_coalesced(key).await?)
            }
        };

        self.metrics.record_size(self.entries.len());
        self.metrics
            .record_latency(QueryOperation::Query, start.elapsed());
        Ok(result)
    }

    async fn prefetch_erased(&self, key: &QueryKey, fetcher: Fetcher, options: &Resolved) {
        let start = Instant::now();
        let fresh = {
            let mut slot = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Slot::new(options));
            slot.apply(options);
            slot.fetcher = Some(fetcher);
            slot.entry.is_fresh()
        };

        if fresh {
            debug!(key = %key, "prefetch skipped, data is fresh");
        } else if let Err(err) = self.fetch_coalesced(key).await {
            warn!(key = %key, error = %err, "prefetch failed");
        }

        self.metrics
            .record_latency(QueryOperation::Prefetch, start.elapsed());
    }

    /// Fetch `key`, joining a fetch already in flight for it
    async fn fetch_coalesced(&self, key: &QueryKey) -> Result<Vec<u8>> {
        let flight = self
            .coalescer
            .do_request(key, || self.run_fetch(key))
            .await;
        if flight.joined {
            self.stats.write().coalesced += 1;
        }
        flight.result
    }

    /// Leader side of a coalesced fetch.
    ///
    /// Fetches again while invalidations keep arriving mid-fetch, so waiters
    /// never receive data older than the last invalidation.
    async fn run_fetch(&self, key: &QueryKey) -> Result<Vec<u8>> {
        loop {
            let (fetcher, retry, previous, epoch) = {
                let slot = self.entries.get(key).ok_or(ShopError::Cancelled)?;
                // Another leader may have finished between our lookup and now
                if slot.entry.is_fresh() {
                    if let Some(data) = &slot.entry.data {
                        return Ok(data.clone());
                    }
                }
                let fetcher = slot
                    .fetcher
                    .clone()
                    .ok_or_else(|| ShopError::Internal(format!("no fetch function for {}", key)))?;
                (
                    fetcher,
                    slot.retry.clone(),
                    slot.entry.data.clone(),
                    slot.entry.epoch,
                )
            };

            let start = Instant::now();
            let (result, attempts) = self
                .fetch_with_retry(key, &retry, || fetcher(previous.clone()))
                .await;
            self.metrics
                .record_latency(QueryOperation::Fetch, start.elapsed());

            let invalidated = self.store_result(key, &result, attempts, epoch);
            if !invalidated || result.is_err() {
                return result;
            }
            debug!(key = %key, "invalidated while fetching, fetching again");
        }
    }

    /// Run `fetch` under `policy`. Returns the outcome and the number of
    /// attempts made.
    async fn fetch_with_retry<T, F, Fut>(
        &self,
        key: &QueryKey,
        policy: &RetryPolicy,
        fetch: F,
    ) -> (Result<T>, u32)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let label = key.to_string();
        let mut attempt = 0u32;
        loop {
            self.metrics.record_fetch(&label, attempt);
            {
                let mut stats = self.stats.write();
                stats.fetches += 1;
                if attempt > 0 {
                    stats.retries += 1;
                }
            }

            match fetch().await {
                Ok(value) => return (Ok(value), attempt + 1),
                Err(err) if policy.should_retry(&err, attempt) => {
                    let delay =
                        with_jitter(policy.backoff.delay_for_attempt(attempt), policy.jitter);
                    debug!(
                        key = %label,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(key = %label, attempts = attempt + 1, error = %err, "fetch failed");
                    self.metrics.record_failure(&label);
                    self.stats.write().failures += 1;
                    return (Err(err), attempt + 1);
                }
            }
        }
    }

    /// Write a fetch outcome. `epoch` is the entry's invalidation epoch when
    /// the fetch started; returns true when an invalidation arrived since, in
    /// which case the stored data stays stale.
    fn store_result(
        &self,
        key: &QueryKey,
        result: &Result<Vec<u8>>,
        attempts: u32,
        epoch: u64,
    ) -> bool {
        let Some(mut slot) = self.entries.get_mut(key) else {
            debug!(key = %key, "entry removed while fetching, result dropped");
            return false;
        };
        match result {
            Ok(bytes) => slot.entry.set_data(bytes.clone()),
            Err(err) => slot.entry.set_error(err.clone(), attempts),
        }
        let invalidated = slot.entry.epoch != epoch;
        if invalidated {
            slot.entry.invalidated = true;
        }
        slot.notify();
        invalidated
    }

    /// Refetch `key` in the background unless a refetch is already running
    fn spawn_refetch(&self, key: &QueryKey) -> bool {
        let client = self.clone();
        let owned = key.clone();
        self.coalescer.try_spawn_refresh(key, move || async move {
            if let Err(err) = client.fetch_coalesced(&owned).await {
                debug!(key = %owned, error = %err, "background refetch failed");
            }
        })
    }
}

impl<S, M> Clone for QueryClient<S, M>
where
    S: Serializer,
    M: QueryMetrics,
{
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            serializer: self.serializer.clone(),
            metrics: self.metrics.clone(),
            stats: self.stats.clone(),
            config: self.config.clone(),
            coalescer: self.coalescer.clone(),
        }
    }
}

/// Stretch `delay` by up to `jitter` (0.0 - 1.0) of itself
fn with_jitter(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 || delay.is_zero() {
        return delay;
    }
    let spread = delay.as_secs_f64() * jitter.min(1.0);
    delay + Duration::from_secs_f64(rand::random::<f64>() * spread)
}
