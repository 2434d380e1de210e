//! Storefront configuration

use std::time::Duration;

use crate::catalog::CatalogConfig;
use crate::persist::BehaviorConfig;
use crate::query::QueryClientConfig;

/// Settings for a [`Storefront`](crate::Storefront)
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub query: QueryClientConfig,
    pub catalog: CatalogConfig,
    pub behavior: BehaviorConfig,
    /// Quiet period before a search term is applied
    pub debounce_delay: Duration,
    /// Hover time before a product is prefetched
    pub prefetch_delay: Duration,
    /// Simulated payment hand-off
    pub checkout_delay: Duration,
    pub search_history_capacity: usize,
    /// How often unobserved query entries are collected; `None` disables it
    pub gc_interval: Option<Duration>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            query: QueryClientConfig::default(),
            catalog: CatalogConfig::default(),
            behavior: BehaviorConfig::default(),
            debounce_delay: Duration::from_millis(300),
            prefetch_delay: Duration::from_millis(300),
            checkout_delay: Duration::from_secs(2),
            search_history_capacity: 10,
            gc_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl StorefrontConfig {
    /// No simulated latency, no retries, no random exploration
    pub fn instant() -> Self {
        Self {
            query: QueryClientConfig::default().no_retry(),
            catalog: CatalogConfig::instant(),
            behavior: BehaviorConfig::default().without_exploration(),
            checkout_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: QueryClientConfig) -> Self {
        self.query = query;
        self
    }

    pub fn with_catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_behavior(mut self, behavior: BehaviorConfig) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn with_prefetch_delay(mut self, delay: Duration) -> Self {
        self.prefetch_delay = delay;
        self
    }

    pub fn with_checkout_delay(mut self, delay: Duration) -> Self {
        self.checkout_delay = delay;
        self
    }

    pub fn with_search_history_capacity(mut self, capacity: usize) -> Self {
        self.search_history_capacity = capacity;
        self
    }

    pub fn with_gc_interval(mut self, every: Duration) -> Self {
        self.gc_interval = Some(every);
        self
    }

    pub fn without_gc(mut self) -> Self {
        self.gc_interval = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.debounce_delay, Duration::from_millis(300));
        assert_eq!(config.prefetch_delay, Duration::from_millis(300));
        assert_eq!(config.checkout_delay, Duration::from_secs(2));
        assert_eq!(config.search_history_capacity, 10);
        assert_eq!(config.behavior.max_viewed, 50);
        assert_eq!(config.behavior.max_recommendations, 5);
        assert_eq!(config.catalog.page_size, 12);
        assert_eq!(config.query.stale_time, Duration::from_secs(5 * 60));
    }

    #[test]
    fn test_builder() {
        let config = StorefrontConfig::instant()
            .with_search_history_capacity(3)
            .with_gc_interval(Duration::from_secs(5));
        assert_eq!(config.checkout_delay, Duration::ZERO);
        assert_eq!(config.behavior.exploration_rate, 0.0);
        assert_eq!(config.search_history_capacity, 3);
        assert_eq!(config.gc_interval, Some(Duration::from_secs(5)));
        assert_eq!(config.without_gc().gc_interval, None);
    }
}
