use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use shophub_core::StorageBackend;

use super::{Persistence, keys};

/// One remembered search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub term: String,
    /// Unix time in milliseconds
    pub timestamp: i64,
    #[serde(alias = "results")]
    pub results_count: usize,
}

/// Most-recent-first search history, capped and de-duplicated by term
pub struct SearchHistory<B: StorageBackend> {
    persistence: Persistence<B>,
    capacity: usize,
    entries: Mutex<Vec<SearchEntry>>,
}

impl<B: StorageBackend> SearchHistory<B> {
    /// Entries kept by default
    pub const DEFAULT_CAPACITY: usize = 10;
    /// Terms returned by [`popular`](Self::popular)
    pub const POPULAR_LIMIT: usize = 5;

    /// Load the stored history
    pub fn load(persistence: Persistence<B>, capacity: usize) -> Self {
        let mut entries: Vec<SearchEntry> = persistence.get_or_default(keys::SEARCH_HISTORY);
        entries.truncate(capacity);
        Self {
            persistence,
            capacity,
            entries: Mutex::new(entries),
        }
    }

    /// Record a search. Blank terms are ignored.
    ///
    /// The trimmed term goes to the front; an older entry with the same term
    /// is dropped, and the oldest entries fall off past the capacity.
    pub fn add(&self, term: &str, results_count: usize) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        let entry = SearchEntry {
            term: term.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            results_count,
        };

        let mut entries = self.entries.lock();
        entries.retain(|existing| existing.term != term);
        entries.insert(0, entry);
        entries.truncate(self.capacity);
        debug!(term, results_count, len = entries.len(), "search recorded");
        self.persistence.set(keys::SEARCH_HISTORY, &*entries);
        true
    }

    pub fn entries(&self) -> Vec<SearchEntry> {
        self.entries.lock().clone()
    }

    pub fn terms(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.term.clone()).collect()
    }

    /// Up to five most recent terms that returned results
    pub fn popular(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.results_count > 0)
            .take(Self::POPULAR_LIMIT)
            .map(|entry| entry.term.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.persistence.remove(keys::SEARCH_HISTORY);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::test_support::BrokenStorage;
    use shophub_storage::MemoryStorage;

    fn history() -> SearchHistory<MemoryStorage> {
        SearchHistory::load(Persistence::new(MemoryStorage::with_defaults()), 10)
    }

    #[test]
    fn test_eleventh_term_evicts_oldest() {
        let history = history();
        for i in 0..11 {
            history.add(&format!("term {i}"), 1);
        }
        let terms = history.terms();
        assert_eq!(terms.len(), 10);
        assert_eq!(terms[0], "term 10");
        assert_eq!(terms[9], "term 1");
        assert!(!terms.contains(&"term 0".to_string()));
    }

    #[test]
    fn test_readding_moves_to_front() {
        let history = history();
        history.add("shoes", 3);
        history.add("coffee", 2);
        history.add("shoes", 0);

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].term, "shoes");
        assert_eq!(entries[0].results_count, 0);
        assert_eq!(entries[1].term, "coffee");
    }

    #[test]
    fn test_blank_terms_ignored_and_trimmed() {
        let history = history();
        assert!(!history.add("   ", 4));
        assert!(history.add("  watch ", 4));
        assert_eq!(history.terms(), vec!["watch"]);
    }

    #[test]
    fn test_popular_skips_empty_results() {
        let history = history();
        for (i, results) in [5, 0, 2, 1, 0, 3, 8, 9].iter().enumerate() {
            history.add(&format!("q{i}"), *results);
        }
        assert_eq!(history.popular(), vec!["q7", "q6", "q5", "q3", "q2"]);
    }

    #[test]
    fn test_persisted_between_loads() {
        let persistence = Persistence::new(MemoryStorage::with_defaults());
        let history = SearchHistory::load(persistence.clone(), 10);
        history.add("lamp", 1);
        history.add("desk", 2);

        let reloaded = SearchHistory::load(persistence.clone(), 10);
        assert_eq!(reloaded.terms(), vec!["desk", "lamp"]);

        let raw = persistence.backend().get_item(keys::SEARCH_HISTORY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["resultsCount"], 2);
        assert!(json[0]["timestamp"].as_i64().unwrap() > 0);

        reloaded.clear();
        assert!(SearchHistory::load(persistence, 10).is_empty());
    }

    #[test]
    fn test_accepts_legacy_results_field() {
        let persistence = Persistence::new(MemoryStorage::with_defaults());
        persistence
            .backend()
            .set_item(
                keys::SEARCH_HISTORY,
                r#"[{"term":"tea","timestamp":1,"results":4}]"#.into(),
            )
            .unwrap();
        let history = SearchHistory::load(persistence, 10);
        assert_eq!(history.entries()[0].results_count, 4);
    }

    #[test]
    fn test_works_without_storage() {
        let history = SearchHistory::load(Persistence::new(BrokenStorage), 10);
        assert!(history.add("offline", 1));
        assert_eq!(history.len(), 1);
    }
}
