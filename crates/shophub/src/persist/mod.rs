//! Fail-soft persistence over a [`StorageBackend`]
//!
//! Reads never fail: a missing key, a backend error and an undecodable value
//! all yield the caller's default. Writes report success as a bool and log
//! failures instead of returning them.

mod behavior;
mod history;
mod prefs;

pub use behavior::{BehaviorConfig, BehaviorTracker, UserBehavior};
pub use history::{SearchEntry, SearchHistory};
pub use prefs::Preferences;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

use shophub_core::{Result, ShopError, StorageBackend};

use crate::store::{CartState, SavedCart};

/// Well-known storage keys
pub mod keys {
    pub const LANGUAGE: &str = "language";
    pub const PWA_BANNER_DISMISSED: &str = "pwa-banner-dismissed";
    pub const USER_BEHAVIOR: &str = "user-behavior";
    pub const SEARCH_HISTORY: &str = "search_history";
    pub const CART: &str = "cart";
}

/// JSON values stored under string keys
pub struct Persistence<B: StorageBackend> {
    backend: Arc<B>,
}

impl<B: StorageBackend> Persistence<B> {
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read and decode `key`, propagating errors. `Ok(None)` when absent.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get_item(key)? {
            Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| ShopError::Deserialization(format!("{key}: {e}"))),
            _ => Ok(None),
        }
    }

    /// Read `key`, falling back to `default` on absence or any failure
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                warn!(
                    key,
                    backend = self.backend.name(),
                    error = %err,
                    "failed to read stored value"
                );
                default
            }
        }
    }

    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get(key, T::default())
    }

    /// Encode and write `value`. Returns false when the write failed.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let written = serde_json::to_string(value)
            .map_err(ShopError::from)
            .and_then(|raw| self.backend.set_item(key, raw));
        self.report(written, key, "failed to write stored value")
    }

    pub fn remove(&self, key: &str) -> bool {
        let removed = self.backend.remove_item(key);
        self.report(removed, key, "failed to remove stored value")
    }

    /// Delete every stored key
    pub fn clear(&self) -> bool {
        let cleared = self.backend.clear();
        self.report(cleared, "*", "failed to clear storage")
    }

    /// Stored keys; empty when the backend cannot list them
    pub fn keys(&self) -> Vec<String> {
        self.backend.keys().unwrap_or_else(|err| {
            warn!(backend = self.backend.name(), error = %err, "failed to list stored keys");
            Vec::new()
        })
    }

    pub fn save_cart(&self, cart: &CartState) -> bool {
        self.set(keys::CART, &cart.to_saved())
    }

    /// Persisted cart, or an empty one
    pub fn load_cart(&self) -> SavedCart {
        self.get_or_default(keys::CART)
    }

    fn report(&self, outcome: Result<()>, key: &str, message: &str) -> bool {
        match outcome {
            Ok(()) => true,
            Err(err) => {
                warn!(key, backend = self.backend.name(), error = %err, "{message}");
                false
            }
        }
    }
}

impl<B: StorageBackend> Clone for Persistence<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::BrokenStorage;
    use super::*;
    use crate::store::CartAction;
    use shophub_core::{Product, Rating};
    use shophub_storage::MemoryStorage;

    #[test]
    fn test_roundtrip_and_defaults() {
        let persistence = Persistence::new(MemoryStorage::with_defaults());
        assert_eq!(persistence.get(keys::LANGUAGE, "en".to_string()), "en");

        assert!(persistence.set(keys::LANGUAGE, "es"));
        assert_eq!(persistence.get(keys::LANGUAGE, "en".to_string()), "es");
        assert_eq!(
            persistence.backend().get_item(keys::LANGUAGE).unwrap().as_deref(),
            Some("\"es\"")
        );

        assert!(persistence.remove(keys::LANGUAGE));
        assert_eq!(persistence.get(keys::LANGUAGE, "en".to_string()), "en");
    }

    #[test]
    fn test_undecodable_value_yields_default() {
        let persistence = Persistence::new(MemoryStorage::with_defaults());
        persistence
            .backend()
            .set_item(keys::PWA_BANNER_DISMISSED, "{not json".into())
            .unwrap();
        assert!(!persistence.get(keys::PWA_BANNER_DISMISSED, false));
        assert!(matches!(
            persistence.try_get::<bool>(keys::PWA_BANNER_DISMISSED),
            Err(ShopError::Deserialization(_))
        ));
    }

    #[test]
    fn test_broken_backend_never_fails_callers() {
        let persistence = Persistence::new(BrokenStorage);
        assert_eq!(persistence.get(keys::LANGUAGE, 7u8), 7);
        assert!(!persistence.set(keys::LANGUAGE, &1u8));
        assert!(!persistence.remove(keys::LANGUAGE));
        assert!(!persistence.clear());
        assert!(persistence.keys().is_empty());
        assert_eq!(persistence.load_cart(), SavedCart::default());
    }

    #[test]
    fn test_cart_survives_save_and_load() {
        let persistence = Persistence::new(MemoryStorage::with_defaults());
        let mut cart = CartState::default();
        cart.apply(CartAction::Add(Product {
            id: 3,
            title: "Mat".into(),
            price: 20.0,
            description: String::new(),
            category: "fitness".into(),
            image: String::new(),
            rating: Rating { rate: 4.1, count: 3 },
        }));
        cart.apply(CartAction::Toggle);

        assert!(persistence.save_cart(&cart));
        let saved = persistence.load_cart();
        assert_eq!(saved.items.len(), 1);
        assert!(saved.is_open);
    }

    #[test]
    fn test_clear_removes_everything() {
        let persistence = Persistence::new(MemoryStorage::with_defaults());
        persistence.set("a", &1);
        persistence.set("b", &2);
        assert_eq!(persistence.keys().len(), 2);
        assert!(persistence.clear());
        assert!(persistence.keys().is_empty());
    }
}
