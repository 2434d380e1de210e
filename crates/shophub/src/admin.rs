//! Cache administration actions, each announced with a toast

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use shophub_core::{ProductSource, QueryMetrics, Serializer, StorageBackend};

use crate::catalog::ProductService;
use crate::notify::{Notifier, Toast};
use crate::persist::Persistence;

pub struct CacheAdmin<R, B, S, M>
where
    R: ProductSource,
    B: StorageBackend,
    S: Serializer,
    M: QueryMetrics,
{
    products: ProductService<R, S, M>,
    persistence: Persistence<B>,
    notifier: Arc<dyn Notifier>,
}

impl<R, B, S, M> CacheAdmin<R, B, S, M>
where
    R: ProductSource,
    B: StorageBackend,
    S: Serializer,
    M: QueryMetrics,
{
    pub fn new(
        products: ProductService<R, S, M>,
        persistence: Persistence<B>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            products,
            persistence,
            notifier,
        }
    }

    /// Drop every query entry
    pub fn clear_cache(&self) {
        let entries = self.products.client().len();
        self.products.client().clear();
        info!(entries, "query cache cleared");
        self.notifier.notify(Toast::new(
            "Cache Cleared",
            "All cached data has been removed.",
        ));
    }

    /// Mark every product query stale. Returns how many entries were marked.
    pub fn invalidate_products(&self) -> usize {
        let marked = self.products.invalidate_products();
        info!(marked, "product queries invalidated");
        self.notifier.notify(Toast::new(
            "Products Refreshed",
            "Product data will be refetched from the server.",
        ));
        marked
    }

    /// Remove every persisted value
    pub fn clear_storage(&self) -> bool {
        let cleared = self.persistence.clear();
        info!(cleared, "local storage cleared");
        self.notifier.notify(Toast::new(
            "Storage Cleared",
            "All local storage data has been removed.",
        ));
        cleared
    }

    /// Start loading the full product list in the background
    ///
    /// Must be called within a Tokio runtime.
    pub fn prefetch_all(&self) -> JoinHandle<()> {
        let products = self.products.clone();
        let task = tokio::spawn(async move { products.prefetch_products().await });
        self.notifier.notify(Toast::new(
            "Prefetch Started",
            "Products are being loaded in the background.",
        ));
        task
    }
}
