//! Query entry type

use std::time::Duration;
use tokio::time::Instant;

use crate::ShopError;

/// Lifecycle status of a query entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// No data yet; a fetch is running or about to run
    Pending,
    /// Last fetch succeeded
    Success,
    /// Last fetch failed after retries were exhausted
    Error,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

/// A cached query result with freshness metadata
///
/// `data` survives a failed refetch, so an entry can be `Error` and still carry
/// the last good payload.
#[derive(Debug, Clone)]
pub struct QueryEntry<T> {
    pub data: Option<T>,
    pub error: Option<ShopError>,
    pub status: QueryStatus,
    /// When `data` was last written
    pub updated_at: Option<Instant>,
    /// Freshness window applied to `updated_at`
    pub stale_time: Duration,
    /// Marked stale by invalidation regardless of age
    pub invalidated: bool,
    /// Bumped by every invalidation
    pub epoch: u64,
    /// Consecutive failed attempts of the last fetch
    pub failure_count: u32,
    /// Completed fetches, successful or not
    pub fetch_count: u64,
}

impl<T> QueryEntry<T> {
    /// Create an entry that has not been fetched yet
    pub fn pending(stale_time: Duration) -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            updated_at: None,
            stale_time,
            invalidated: false,
            epoch: 0,
            failure_count: 0,
            fetch_count: 0,
        }
    }

    /// Create an entry holding freshly fetched data
    pub fn with_data(data: T, stale_time: Duration) -> Self {
        let mut entry = Self::pending(stale_time);
        entry.set_data(data);
        entry
    }

    /// Record a successful fetch
    pub fn set_data(&mut self, data: T) {
        self.data = Some(data);
        self.error = None;
        self.status = QueryStatus::Success;
        self.updated_at = Some(Instant::now());
        self.invalidated = false;
        self.failure_count = 0;
        self.fetch_count += 1;
    }

    /// Mark the data stale and start a new invalidation epoch
    pub fn invalidate(&mut self) {
        self.invalidated = true;
        self.epoch += 1;
    }

    /// Record a fetch that failed after `attempts` attempts
    pub fn set_error(&mut self, error: ShopError, attempts: u32) {
        self.error = Some(error);
        self.status = QueryStatus::Error;
        self.failure_count = attempts;
        self.fetch_count += 1;
    }

    /// Instant after which the data is stale
    pub fn stale_at(&self) -> Option<Instant> {
        self.updated_at.map(|at| at + self.stale_time)
    }

    /// Whether the entry holds data that should be refetched
    pub fn is_stale(&self) -> bool {
        if self.invalidated {
            return true;
        }
        match self.stale_at() {
            Some(stale_at) => Instant::now() >= stale_at,
            None => true,
        }
    }

    /// Fresh data can be served without touching the source
    pub fn is_fresh(&self) -> bool {
        self.data.is_some() && !self.is_stale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_entry_is_stale_without_data() {
        let entry: QueryEntry<u32> = QueryEntry::pending(Duration::from_secs(60));
        assert_eq!(entry.status, QueryStatus::Pending);
        assert!(entry.is_stale());
        assert!(!entry.is_fresh());
        assert!(entry.stale_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale_after_stale_time() {
        let entry = QueryEntry::with_data(7u32, Duration::from_secs(60));
        assert!(entry.is_fresh());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(entry.is_fresh());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(entry.is_stale());
        assert_eq!(entry.data, Some(7));
    }

    #[test]
    fn test_invalidated_entry_is_stale() {
        let mut entry = QueryEntry::with_data("x", Duration::from_secs(600));
        entry.invalidate();
        assert!(entry.is_stale());
        assert_eq!(entry.epoch, 1);

        entry.set_data("y");
        assert!(entry.is_fresh());
    }

    #[test]
    fn test_error_keeps_previous_data() {
        let mut entry = QueryEntry::with_data(1u8, Duration::ZERO);
        entry.set_error(ShopError::Fetch("down".into()), 4);
        assert_eq!(entry.status, QueryStatus::Error);
        assert_eq!(entry.data, Some(1));
        assert_eq!(entry.failure_count, 4);
        assert_eq!(entry.fetch_count, 2);
    }
}
