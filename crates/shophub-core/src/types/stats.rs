//! Query cache statistics

/// Counters for data-fetch cache activity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    /// Fresh cache hits
    pub hits: u64,
    /// Stale data served
    pub stale_hits: u64,
    /// Lookups that had to wait for a fetch
    pub misses: u64,
    /// Fetch attempts issued against a source
    pub fetches: u64,
    /// Attempts that were retries
    pub retries: u64,
    /// Fetches that failed after exhausting retries
    pub failures: u64,
    /// Requests that joined an in-flight fetch instead of issuing one
    pub coalesced: u64,
    /// Entries removed by garbage collection
    pub evictions: u64,
    /// Current number of entries
    pub entries: usize,
}

impl QueryStats {
    /// Calculate hit ratio (0.0 to 1.0), counting stale hits as hits
    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            (self.hits + self.stale_hits) as f64 / total as f64
        }
    }

    /// Total lookups
    pub fn total_requests(&self) -> u64 {
        self.hits + self.stale_hits + self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stats() {
        let stats = QueryStats::default();
        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn test_hit_ratio_counts_stale() {
        let stats = QueryStats {
            hits: 60,
            stale_hits: 20,
            misses: 20,
            ..Default::default()
        };
        assert_eq!(stats.total_requests(), 100);
        assert!((stats.hit_ratio() - 0.8).abs() < f64::EPSILON);
    }
}
