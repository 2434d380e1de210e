//! Metrics trait for query cache observability

use std::time::Duration;

/// Query cache operation for latency tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOperation {
    Query,
    Fetch,
    FetchPage,
    Prefetch,
    Invalidate,
    Collect,
}

impl QueryOperation {
    /// Get operation as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperation::Query => "query",
            QueryOperation::Fetch => "fetch",
            QueryOperation::FetchPage => "fetch_page",
            QueryOperation::Prefetch => "prefetch",
            QueryOperation::Invalidate => "invalidate",
            QueryOperation::Collect => "collect",
        }
    }
}

/// Reason an entry left the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Unobserved for longer than the gc window
    Unobserved,
    /// Removed explicitly
    Removed,
    /// Dropped by `clear`
    Cleared,
}

impl EvictionReason {
    /// Get reason as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Unobserved => "unobserved",
            EvictionReason::Removed => "removed",
            EvictionReason::Cleared => "cleared",
        }
    }
}

/// Hook for query cache metrics
///
/// Implement this to integrate with your metrics system (Prometheus, StatsD, etc.)
pub trait QueryMetrics: Send + Sync + 'static {
    /// Fresh data served
    fn record_hit(&self, key: &str);

    /// Stale data served
    fn record_stale_hit(&self, key: &str);

    /// Lookup had to wait for a fetch
    fn record_miss(&self, key: &str);

    /// One fetch attempt (0-indexed) issued
    fn record_fetch(&self, key: &str, attempt: u32);

    /// Fetch exhausted its retries
    fn record_failure(&self, key: &str);

    /// Record operation latency
    fn record_latency(&self, operation: QueryOperation, duration: Duration);

    /// Record an eviction
    fn record_eviction(&self, reason: EvictionReason);

    /// Record cache size
    fn record_size(&self, entries: usize);
}

/// No-op metrics implementation (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl QueryMetrics for NoopMetrics {
    #[inline]
    fn record_hit(&self, _key: &str) {}

    #[inline]
    fn record_stale_hit(&self, _key: &str) {}

    #[inline]
    fn record_miss(&self, _key: &str) {}

    #[inline]
    fn record_fetch(&self, _key: &str, _attempt: u32) {}

    #[inline]
    fn record_failure(&self, _key: &str) {}

    #[inline]
    fn record_latency(&self, _operation: QueryOperation, _duration: Duration) {}

    #[inline]
    fn record_eviction(&self, _reason: EvictionReason) {}

    #[inline]
    fn record_size(&self, _entries: usize) {}
}

/// Metrics adapter using the `metrics` crate
///
/// Emits `<prefix>_hits_total`, `<prefix>_fetches_total`,
/// `<prefix>_operation_duration_seconds` and friends.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl QueryMetrics for MetricsCrateAdapter {
    fn record_hit(&self, _key: &str) {
        metrics::counter!(self.metric_name("hits_total"), "freshness" => "fresh").increment(1);
    }

    fn record_stale_hit(&self, _key: &str) {
        metrics::counter!(self.metric_name("hits_total"), "freshness" => "stale").increment(1);
    }

    fn record_miss(&self, _key: &str) {
        metrics::counter!(self.metric_name("misses_total")).increment(1);
    }

    fn record_fetch(&self, _key: &str, attempt: u32) {
        let kind = if attempt == 0 { "initial" } else { "retry" };
        metrics::counter!(self.metric_name("fetches_total"), "kind" => kind).increment(1);
    }

    fn record_failure(&self, _key: &str) {
        metrics::counter!(self.metric_name("failures_total")).increment(1);
    }

    fn record_latency(&self, operation: QueryOperation, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "operation" => operation.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn record_eviction(&self, reason: EvictionReason) {
        metrics::counter!(
            self.metric_name("evictions_total"),
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    fn record_size(&self, entries: usize) {
        metrics::gauge!(self.metric_name("entries")).set(entries as f64);
    }
}
