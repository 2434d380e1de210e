//! JSON-file storage backend

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shophub_core::{ShopError, StorageBackend};

/// Configuration for the file backend
#[derive(Debug, Clone)]
pub struct FileConfig {
    /// Path of the JSON document
    pub path: PathBuf,
    /// Write indented JSON
    pub pretty: bool,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: false,
        }
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

/// Key-value storage that survives restarts
///
/// The whole map is held in memory and rewritten on every mutation through a
/// temporary file plus rename, so a crash never leaves a half-written document.
#[derive(Clone)]
pub struct FileStorage {
    data: Arc<Mutex<BTreeMap<String, String>>>,
    config: FileConfig,
}

impl FileStorage {
    /// Open (or lazily create) the document at `config.path`
    pub fn open(config: FileConfig) -> Result<Self, ShopError> {
        let data = match fs::read_to_string(&config.path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                ShopError::Persistence(format!("corrupt {}: {}", config.path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ShopError::Persistence(format!(
                    "read {}: {}",
                    config.path.display(),
                    e
                )));
            }
        };

        Ok(Self {
            data: Arc::new(Mutex::new(data)),
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn flush(&self, data: &BTreeMap<String, String>) -> Result<(), ShopError> {
        let text = if self.config.pretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        }
        .map_err(|e| ShopError::Serialization(e.to_string()))?;

        let tmp = self.config.path.with_extension("tmp");
        fs::write(&tmp, text)
            .and_then(|_| fs::rename(&tmp, &self.config.path))
            .map_err(|e| {
                ShopError::Persistence(format!("write {}: {}", self.config.path.display(), e))
            })
    }

    /// Apply `mutate` and persist; the in-memory map is rolled back if the write fails
    fn mutate<F>(&self, mutate: F) -> Result<(), ShopError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut data = self.data.lock();
        let previous = data.clone();
        mutate(&mut data);
        if let Err(err) = self.flush(&data) {
            *data = previous;
            return Err(err);
        }
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, ShopError> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), ShopError> {
        self.mutate(|data| {
            data.insert(key.to_string(), value);
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), ShopError> {
        if !self.data.lock().contains_key(key) {
            return Ok(());
        }
        self.mutate(|data| {
            data.remove(key);
        })
    }

    fn clear(&self) -> Result<(), ShopError> {
        self.mutate(|data| data.clear())
    }

    fn keys(&self) -> Result<Vec<String>, ShopError> {
        Ok(self.data.lock().keys().cloned().collect())
    }

    fn len(&self) -> Result<usize, ShopError> {
        Ok(self.data.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::open(FileConfig::new(&path)).unwrap();
        storage.set_item("language", "\"fr\"".into()).unwrap();
        storage.set_item("pwa-banner-dismissed", "true".into()).unwrap();
        storage.remove_item("pwa-banner-dismissed").unwrap();
        drop(storage);

        let reopened = FileStorage::open(FileConfig::new(&path)).unwrap();
        assert_eq!(
            reopened.get_item("language").unwrap(),
            Some("\"fr\"".to_string())
        );
        assert_eq!(reopened.get_item("pwa-banner-dismissed").unwrap(), None);
        assert_eq!(reopened.keys().unwrap(), vec!["language".to_string()]);
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(FileConfig::new(dir.path().join("absent.json"))).unwrap();
        assert!(storage.is_empty().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileStorage::open(FileConfig::new(&path)).err().unwrap();
        assert!(matches!(err, ShopError::Persistence(_)));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist, so every flush fails
        let path = dir.path().join("missing-dir").join("storage.json");
        let storage = FileStorage::open(FileConfig::new(&path)).unwrap();

        assert!(storage.set_item("k", "v".into()).is_err());
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_clear_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let storage = FileStorage::open(FileConfig::new(&path).pretty()).unwrap();
        storage.set_item("a", "1".into()).unwrap();
        storage.clear().unwrap();

        let reopened = FileStorage::open(FileConfig::new(&path)).unwrap();
        assert!(reopened.is_empty().unwrap());
    }
}
