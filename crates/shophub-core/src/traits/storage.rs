//! Durable key-value storage trait

use crate::ShopError;

/// Raw string key-value storage
///
/// Operations are synchronous and may fail; callers that must never fail wrap
/// a backend in a fail-soft layer.
pub trait StorageBackend: Send + Sync + 'static {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Read a raw value; `None` when the key is absent
    fn get_item(&self, key: &str) -> Result<Option<String>, ShopError>;

    /// Write a raw value, replacing any previous one
    fn set_item(&self, key: &str, value: String) -> Result<(), ShopError>;

    /// Delete a key; absent keys are not an error
    fn remove_item(&self, key: &str) -> Result<(), ShopError>;

    /// Delete every key
    fn clear(&self) -> Result<(), ShopError>;

    /// Stored keys, in no particular order
    fn keys(&self) -> Result<Vec<String>, ShopError>;

    /// Number of stored keys
    fn len(&self) -> Result<usize, ShopError> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool, ShopError> {
        Ok(self.len()? == 0)
    }
}
