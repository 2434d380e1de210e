//! Query options, retry policy and builders

use std::time::Duration;

use super::page::Cursor;
use crate::ShopError;

/// Delay strategy between fetch attempts
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Same delay before every retry
    Fixed(Duration),
    /// `base * 2^attempt`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before retry number `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt);
                base.saturating_mul(factor).min(*max)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

/// Retry policy applied uniformly around every fetch function
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Random extra delay as a fraction of the backoff (0.0 - 1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Fail on the first error
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::None,
            jitter: 0.0,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Disable jitter
    pub fn no_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether a failure on attempt `attempt` (0-indexed) should be retried
    pub fn should_retry(&self, err: &ShopError, attempt: u32) -> bool {
        attempt < self.max_retries && err.is_retryable()
    }
}

/// Per-query configuration; unset fields fall back to the client defaults
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// How long fetched data counts as fresh
    pub stale_time: Option<Duration>,
    /// How long an unobserved entry survives before eviction
    pub gc_time: Option<Duration>,
    /// Retry policy for this query's fetches
    pub retry: Option<RetryPolicy>,
    /// First cursor of an infinite query
    pub initial_page_param: Cursor,
}

/// Builder for QueryOptions with fluent API
#[derive(Debug, Clone, Default)]
pub struct QueryOpts(QueryOptions);

impl QueryOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stale_time(mut self, duration: Duration) -> Self {
        self.0.stale_time = Some(duration);
        self
    }

    pub fn stale_secs(self, seconds: u64) -> Self {
        self.stale_time(Duration::from_secs(seconds))
    }

    pub fn stale_mins(self, minutes: u64) -> Self {
        self.stale_time(Duration::from_secs(minutes * 60))
    }

    pub fn gc_time(mut self, duration: Duration) -> Self {
        self.0.gc_time = Some(duration);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.0.retry = Some(policy);
        self
    }

    /// Fail on the first error
    pub fn no_retry(self) -> Self {
        self.retry(RetryPolicy::none())
    }

    /// Cursor an infinite query starts from
    pub fn initial_page(mut self, cursor: Cursor) -> Self {
        self.0.initial_page_param = cursor;
        self
    }

    pub fn build(self) -> QueryOptions {
        self.0
    }
}

impl From<QueryOpts> for QueryOptions {
    fn from(opts: QueryOpts) -> Self {
        opts.0
    }
}

impl From<Duration> for QueryOptions {
    fn from(stale_time: Duration) -> Self {
        QueryOptions {
            stale_time: Some(stale_time),
            ..Default::default()
        }
    }
}
