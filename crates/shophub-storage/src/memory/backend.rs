//! In-memory storage backend using DashMap

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use shophub_core::{ShopError, StorageBackend};

/// Configuration for the memory backend
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum bytes of keys plus values (0 = unlimited)
    pub max_bytes: usize,
    /// Maximum number of keys (0 = unlimited)
    pub max_entries: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            // Same order of magnitude as a browser origin's localStorage quota
            max_bytes: 5 * 1024 * 1024,
            max_entries: 0,
        }
    }
}

impl MemoryConfig {
    /// Create config with a byte quota
    pub fn with_quota(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Default::default()
        }
    }

    /// Create config without any limits
    pub fn unlimited() -> Self {
        Self {
            max_bytes: 0,
            max_entries: 0,
        }
    }
}

/// Counters for storage activity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageStats {
    pub reads: u64,
    pub writes: u64,
    pub removes: u64,
    /// Writes refused because of a quota
    pub rejected: u64,
}

/// In-memory key-value storage
///
/// Cloning creates a new handle to the SAME underlying store.
#[derive(Clone)]
pub struct MemoryStorage {
    data: Arc<DashMap<String, String>>,
    stats: Arc<RwLock<StorageStats>>,
    config: MemoryConfig,
}

impl MemoryStorage {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            stats: Arc::new(RwLock::new(StorageStats::default())),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Approximate bytes held (keys plus values)
    pub fn memory_usage(&self) -> usize {
        self.data
            .iter()
            .map(|entry| entry.key().len() + entry.value().len())
            .sum()
    }

    pub fn stats(&self) -> StorageStats {
        self.stats.read().clone()
    }

    /// Check quotas for writing `value` under `key`
    fn check_quota(&self, key: &str, value: &str) -> Result<(), ShopError> {
        let existing = self.data.get(key).map(|v| key.len() + v.len());

        if self.config.max_entries > 0
            && existing.is_none()
            && self.data.len() >= self.config.max_entries
        {
            return Err(ShopError::Persistence(format!(
                "entry limit of {} reached writing {}",
                self.config.max_entries, key
            )));
        }

        if self.config.max_bytes > 0 {
            let projected = self.memory_usage() - existing.unwrap_or(0) + key.len() + value.len();
            if projected > self.config.max_bytes {
                return Err(ShopError::Persistence(format!(
                    "quota of {} bytes exceeded writing {}",
                    self.config.max_bytes, key
                )));
            }
        }

        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, ShopError> {
        self.stats.write().reads += 1;
        Ok(self.data.get(key).map(|value| value.value().clone()))
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), ShopError> {
        if let Err(err) = self.check_quota(key, &value) {
            self.stats.write().rejected += 1;
            return Err(err);
        }
        self.data.insert(key.to_string(), value);
        self.stats.write().writes += 1;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), ShopError> {
        if self.data.remove(key).is_some() {
            self.stats.write().removes += 1;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), ShopError> {
        self.data.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, ShopError> {
        Ok(self.data.iter().map(|entry| entry.key().clone()).collect())
    }

    fn len(&self) -> Result<usize, ShopError> {
        Ok(self.data.len())
    }
}
