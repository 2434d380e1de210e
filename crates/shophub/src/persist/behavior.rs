use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use shophub_core::{ProductId, StorageBackend};

use super::{Persistence, keys};

/// Limits for [`BehaviorTracker`]
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorConfig {
    /// Distinct viewed products remembered
    pub max_viewed: usize,
    /// Length of the recommendation list
    pub max_recommendations: usize,
    /// Chance that a non-recommended product is still prefetched, 0.0 to 1.0
    pub exploration_rate: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_viewed: 50,
            max_recommendations: 5,
            exploration_rate: 0.3,
        }
    }
}

impl BehaviorConfig {
    /// Prefetch recommended products only
    pub fn without_exploration(mut self) -> Self {
        self.exploration_rate = 0.0;
        self
    }

    pub fn with_exploration_rate(mut self, rate: f64) -> Self {
        self.exploration_rate = rate.clamp(0.0, 1.0);
        self
    }
}

/// Browsing signals, stored under `user-behavior`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserBehavior {
    /// Distinct product ids in first-viewed order
    pub viewed_products: Vec<ProductId>,
    pub category_interactions: BTreeMap<String, u32>,
    /// Milliseconds spent on each product page
    pub time_spent_on_products: BTreeMap<ProductId, u64>,
}

struct Tracking {
    behavior: UserBehavior,
    current: Option<(ProductId, Instant)>,
}

/// Records what the shopper looks at and ranks products for prefetching
pub struct BehaviorTracker<B: StorageBackend> {
    persistence: Persistence<B>,
    config: BehaviorConfig,
    tracking: Mutex<Tracking>,
}

impl<B: StorageBackend> BehaviorTracker<B> {
    pub fn load(persistence: Persistence<B>, config: BehaviorConfig) -> Self {
        let behavior = persistence.get_or_default(keys::USER_BEHAVIOR);
        Self {
            persistence,
            config,
            tracking: Mutex::new(Tracking {
                behavior,
                current: None,
            }),
        }
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Record a product view and start timing it
    pub fn track_view(&self, id: ProductId) {
        let mut tracking = self.tracking.lock();
        let viewed = &mut tracking.behavior.viewed_products;
        if !viewed.contains(&id) {
            viewed.push(id);
        }
        let overflow = viewed.len().saturating_sub(self.config.max_viewed);
        viewed.drain(..overflow);
        tracking.current = Some((id, Instant::now()));
        self.save(&tracking.behavior);
    }

    /// Stop timing the current product, adding the elapsed time to its total
    pub fn track_leave(&self) -> Option<Duration> {
        let mut tracking = self.tracking.lock();
        let (id, started) = tracking.current.take()?;
        let spent = started.elapsed();
        let total = tracking
            .behavior
            .time_spent_on_products
            .entry(id)
            .or_default();
        *total = total.saturating_add(spent.as_millis() as u64);
        debug!(product_id = id, spent_ms = spent.as_millis() as u64, "product view ended");
        self.save(&tracking.behavior);
        Some(spent)
    }

    pub fn track_category(&self, category: &str) {
        let mut tracking = self.tracking.lock();
        *tracking
            .behavior
            .category_interactions
            .entry(category.to_string())
            .or_default() += 1;
        self.save(&tracking.behavior);
    }

    /// Viewed products ranked by time spent, longest first
    pub fn recommended(&self) -> Vec<ProductId> {
        let tracking = self.tracking.lock();
        let behavior = &tracking.behavior;
        let mut ranked = behavior.viewed_products.clone();
        ranked.sort_by_key(|id| {
            std::cmp::Reverse(behavior.time_spent_on_products.get(id).copied().unwrap_or(0))
        });
        ranked.truncate(self.config.max_recommendations);
        ranked
    }

    /// Prefetch recommended products, plus a random share of the rest
    pub fn should_prefetch(&self, id: ProductId) -> bool {
        self.recommended().contains(&id) || rand::random::<f64>() < self.config.exploration_rate
    }

    pub fn behavior(&self) -> UserBehavior {
        self.tracking.lock().behavior.clone()
    }

    /// Forget everything, in memory and in storage
    pub fn reset(&self) {
        let mut tracking = self.tracking.lock();
        tracking.behavior = UserBehavior::default();
        tracking.current = None;
        self.persistence.remove(keys::USER_BEHAVIOR);
    }

    fn save(&self, behavior: &UserBehavior) {
        self.persistence.set(keys::USER_BEHAVIOR, behavior);
    }
}
