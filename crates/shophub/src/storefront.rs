//! Composition root wiring the cache, store, persistence and timers together

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use shophub_core::{
    JsonSerializer, NoopMetrics, Page, Product, ProductFilters, ProductId, ProductSource,
    Result, StorageBackend,
};

use crate::admin::CacheAdmin;
use crate::catalog::{ProductRepository, ProductService};
use crate::checkout::{OrderSummary, checkout};
use crate::config::StorefrontConfig;
use crate::notify::Notifier;
use crate::persist::{BehaviorTracker, Persistence, Preferences, SearchHistory};
use crate::query::{InfiniteQuery, QueryClient};
use crate::schedule::{Debouncer, Prefetcher};
use crate::store::Store;

type Catalog = Arc<RwLock<Arc<Vec<Product>>>>;

/// One shopper session
///
/// The cart is restored from storage on creation and saved after every cart
/// change. Search input is debounced before it reaches the store, and every
/// applied search is recorded in the history.
pub struct Storefront<B, R = ProductRepository>
where
    B: StorageBackend,
    R: ProductSource,
{
    config: StorefrontConfig,
    products: ProductService<R>,
    store: Store,
    persistence: Persistence<B>,
    preferences: Preferences<B>,
    history: Arc<SearchHistory<B>>,
    behavior: BehaviorTracker<B>,
    prefetcher: Prefetcher<R, JsonSerializer, NoopMetrics>,
    search: Debouncer<String>,
    admin: CacheAdmin<R, B, JsonSerializer, NoopMetrics>,
    notifier: Arc<dyn Notifier>,
    catalog: Catalog,
    gc: Mutex<Option<JoinHandle<()>>>,
}

impl<B, R> Storefront<B, R>
where
    B: StorageBackend,
    R: ProductSource,
{
    /// Assemble a storefront over `backend` and `source`.
    ///
    /// Garbage collection only runs when this is called within a Tokio
    /// runtime; the timers used later always need one.
    pub fn new(
        backend: B,
        source: R,
        config: StorefrontConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let client = QueryClient::with_config(config.query.clone());
        let products =
            ProductService::new(client.clone(), Arc::new(source), config.catalog.page_size);
        let persistence = Persistence::new(backend);

        let store = Store::create();
        let saved = persistence.load_cart();
        if !saved.items.is_empty() {
            debug!(items = saved.items.len(), "restoring saved cart");
            store.hydrate_cart(saved.items);
        }
        if saved.is_open {
            store.toggle_cart();
        }
        {
            let persistence = persistence.clone();
            store.on_cart_change(move |cart| {
                persistence.save_cart(cart);
            });
        }

        let catalog: Catalog = Arc::new(RwLock::new(Arc::new(Vec::new())));
        let history = Arc::new(SearchHistory::load(
            persistence.clone(),
            config.search_history_capacity,
        ));
        let search = {
            let store = store.clone();
            let history = history.clone();
            let catalog = catalog.clone();
            Debouncer::new(config.debounce_delay, move |term: String| {
                store.set_search_term(term.as_str());
                let products = current_products(&catalog, &store);
                let results = store.filter_products(&products).len();
                history.add(&term, results);
            })
        };

        let gc = match (config.gc_interval, tokio::runtime::Handle::try_current()) {
            (Some(every), Ok(_)) => Some(client.spawn_gc(every)),
            (Some(_), Err(_)) => {
                warn!("no tokio runtime; query garbage collection disabled");
                None
            }
            (None, _) => None,
        };

        Self {
            preferences: Preferences::new(persistence.clone()),
            behavior: BehaviorTracker::load(persistence.clone(), config.behavior.clone()),
            prefetcher: Prefetcher::new(products.clone(), config.prefetch_delay),
            admin: CacheAdmin::new(products.clone(), persistence.clone(), notifier.clone()),
            config,
            products,
            store,
            persistence,
            history,
            search,
            notifier,
            catalog,
            gc: Mutex::new(gc),
        }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn client(&self) -> &QueryClient {
        self.products.client()
    }

    pub fn products(&self) -> &ProductService<R> {
        &self.products
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn persistence(&self) -> &Persistence<B> {
        &self.persistence
    }

    pub fn preferences(&self) -> &Preferences<B> {
        &self.preferences
    }

    pub fn history(&self) -> &SearchHistory<B> {
        &self.history
    }

    pub fn behavior(&self) -> &BehaviorTracker<B> {
        &self.behavior
    }

    pub fn prefetcher(&self) -> &Prefetcher<R, JsonSerializer, NoopMetrics> {
        &self.prefetcher
    }

    pub fn admin(&self) -> &CacheAdmin<R, B, JsonSerializer, NoopMetrics> {
        &self.admin
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Filters currently selected in the store
    pub fn filters(&self) -> ProductFilters {
        let filter = self.store.filter();
        ProductFilters::new(filter.selected_category, filter.search_term)
    }

    /// Load the catalog through the query cache, keyed by the current filters
    pub async fn load_products(&self) -> Result<Arc<Vec<Product>>> {
        let products = self.products.products(self.filters()).await?.value();
        let mut catalog = self.catalog.write();
        // Keep the old allocation when nothing changed so memoized views hold
        if **catalog != products {
            *catalog = Arc::new(products);
        }
        Ok(catalog.clone())
    }

    /// Loaded catalog narrowed by the current filters
    pub fn visible_products(&self) -> Arc<Vec<Product>> {
        self.store
            .filter_products(&current_products(&self.catalog, &self.store))
    }

    /// Paged catalog for the current filters, first page loaded
    pub async fn infinite_products(&self) -> Result<InfiniteQuery<Page<Product>>> {
        self.products.infinite_products(self.filters()).await
    }

    /// Feed a keystroke's worth of search input through the debouncer
    pub fn search(&self, term: impl Into<String>) {
        self.search.call(term.into());
    }

    pub fn set_category(&self, category: &str) {
        self.store.set_selected_category(category);
        self.behavior.track_category(category);
    }

    /// Open a product page: records the view and loads the product
    pub async fn view_product(&self, id: ProductId) -> Result<Product> {
        self.behavior.track_view(id);
        Ok(self.products.product(id).await?.value())
    }

    /// Close the current product page
    pub fn leave_product(&self) -> Option<Duration> {
        self.behavior.track_leave()
    }

    /// Pointer entered a product card. Returns true when a prefetch was armed.
    pub fn hover_product(&self, id: ProductId) -> bool {
        if !self.behavior.should_prefetch(id) {
            return false;
        }
        self.prefetcher.hover(id);
        true
    }

    /// Pointer left a product card
    pub fn unhover_product(&self, id: ProductId) -> bool {
        self.prefetcher.cancel(id)
    }

    pub fn add_to_cart(&self, product: Product) -> bool {
        self.store.add_to_cart(product)
    }

    pub async fn checkout(&self) -> Result<OrderSummary> {
        checkout(&self.store, self.notifier.as_ref(), self.config.checkout_delay).await
    }

    /// Window regained focus or the network came back
    pub fn refocus(&self) -> usize {
        self.products.client().refetch_active()
    }

    /// Stop timers and background work, save the cart, and close the store
    pub fn dispose(&self) {
        if let Some(gc) = self.gc.lock().take() {
            gc.abort();
        }
        self.prefetcher.cancel_all();
        self.search.cancel();
        if !self.store.is_disposed() {
            self.persistence.save_cart(&self.store.cart());
            self.store.dispose();
        }
        debug!("storefront disposed");
    }
}

impl<B, R> Drop for Storefront<B, R>
where
    B: StorageBackend,
    R: ProductSource,
{
    fn drop(&mut self) {
        if let Some(gc) = self.gc.lock().take() {
            gc.abort();
        }
    }
}

#[cfg(feature = "memory")]
impl Storefront<shophub_storage::MemoryStorage> {
    /// Demo catalog over in-memory storage, toasts logged through tracing
    pub fn in_memory(config: StorefrontConfig) -> Self {
        let repository = ProductRepository::demo(config.catalog.clone());
        Self::new(
            shophub_storage::MemoryStorage::with_defaults(),
            repository,
            config,
            Arc::new(crate::notify::TracingNotifier),
        )
    }
}

#[cfg(feature = "file")]
impl Storefront<shophub_storage::FileStorage> {
    /// Demo catalog with state kept in a JSON file at `path`
    pub fn open(path: impl Into<std::path::PathBuf>, config: StorefrontConfig) -> Result<Self> {
        let storage = shophub_storage::FileStorage::open(shophub_storage::FileConfig::new(path))?;
        let repository = ProductRepository::demo(config.catalog.clone());
        Ok(Self::new(
            storage,
            repository,
            config,
            Arc::new(crate::notify::TracingNotifier),
        ))
    }
}

fn current_products(catalog: &Catalog, store: &Store) -> Arc<Vec<Product>> {
    let loaded = catalog.read().clone();
    if loaded.is_empty() {
        store.filter().products
    } else {
        loaded
    }
}
