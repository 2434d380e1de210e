
use crate::{EvictionReason, QueryMetrics, QueryOperation};
use std::time::Duration;
use tracing::{debug, warn};

/// Metrics adapter that logs query cache events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    service_name: Option<String>,
}

impl TracingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl QueryMetrics for TracingMetrics {
    fn record_hit(&self, key: &str) {
        debug!(
            target: "shophub",
            event = "hit",
            key = %key,
            service = ?self.service_name,
            "Query Hit"
        );
    }

    fn record_stale_hit(&self, key: &str) {
        debug!(
            target: "shophub",
            event = "stale_hit",
            key = %key,
            service = ?self.service_name,
            "Query Stale Hit"
        );
    }

    fn record_miss(&self, key: &str) {
        debug!(
            target: "shophub",
            event = "miss",
            key = %key,
            service = ?self.service_name,
            "Query Miss"
        );
    }

    fn record_fetch(&self, key: &str, attempt: u32) {
        debug!(
            target: "shophub",
            event = "fetch",
            key = %key,
            attempt = attempt,
            service = ?self.service_name,
            "Query Fetch"
        );
    }

    fn record_failure(&self, key: &str) {
        warn!(
            target: "shophub",
            event = "failure",
            key = %key,
            service = ?self.service_name,
            "Query Failed"
        );
    }

    fn record_latency(&self, operation: QueryOperation, duration: Duration) {
        tracing::trace!(
            target: "shophub",
            event = "latency",
            operation = operation.as_str(),
            duration_ms = duration.as_millis(),
            service = ?self.service_name,
            "Query Operation Latency"
        );
    }

    fn record_eviction(&self, reason: EvictionReason) {
        debug!(
            target: "shophub",
            event = "eviction",
            reason = reason.as_str(),
            service = ?self.service_name,
            "Query Eviction"
        );
    }

    fn record_size(&self, entries: usize) {
        tracing::trace!(
            target: "shophub",
            event = "size",
            entries = entries,
            service = ?self.service_name,
            "Query Cache Size"
        );
    }
}
