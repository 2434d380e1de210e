use shophub_core::StorageBackend;

use super::{Persistence, keys};

/// Small user preferences kept across sessions
pub struct Preferences<B: StorageBackend> {
    persistence: Persistence<B>,
}

impl<B: StorageBackend> Preferences<B> {
    pub const DEFAULT_LANGUAGE: &'static str = "en";

    pub fn new(persistence: Persistence<B>) -> Self {
        Self { persistence }
    }

    /// Interface language code, `"en"` until changed
    pub fn language(&self) -> String {
        self.persistence
            .get(keys::LANGUAGE, Self::DEFAULT_LANGUAGE.to_string())
    }

    pub fn set_language(&self, language: &str) -> bool {
        self.persistence.set(keys::LANGUAGE, language)
    }

    pub fn pwa_banner_dismissed(&self) -> bool {
        self.persistence.get(keys::PWA_BANNER_DISMISSED, false)
    }

    pub fn dismiss_pwa_banner(&self) -> bool {
        self.persistence.set(keys::PWA_BANNER_DISMISSED, &true)
    }
}

impl<B: StorageBackend> Clone for Preferences<B> {
    fn clone(&self) -> Self {
        Self {
            persistence: self.persistence.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::test_support::BrokenStorage;
    use shophub_storage::MemoryStorage;

    #[test]
    fn test_defaults_then_updates() {
        let prefs = Preferences::new(Persistence::new(MemoryStorage::with_defaults()));
        assert_eq!(prefs.language(), "en");
        assert!(!prefs.pwa_banner_dismissed());

        prefs.set_language("es");
        prefs.dismiss_pwa_banner();
        assert_eq!(prefs.language(), "es");
        assert!(prefs.pwa_banner_dismissed());
    }

    #[test]
    fn test_broken_storage_keeps_defaults() {
        let prefs = Preferences::new(Persistence::new(BrokenStorage));
        assert!(!prefs.set_language("fr"));
        assert_eq!(prefs.language(), "en");
        assert!(!prefs.pwa_banner_dismissed());
    }
}
