//! Application store
//!
//! Two slices, cart and filter, behind one lock. Every state change goes
//! through [`Store::dispatch`], which applies the transition, bumps the
//! revision and wakes subscribers. Readers get cheap clones: item and product
//! lists are shared `Arc`s that are swapped, never edited in place.

mod cart;
mod filter;
pub mod selectors;

pub use cart::{CartAction, CartState, SavedCart};
pub use filter::{FETCH_FAILED, FilterAction, FilterState};
pub use selectors::{Memo, Selectors};

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use shophub_core::{CartItem, Product, ProductId, ProductSource, Result};

/// Any store transition
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Cart(CartAction),
    Filter(FilterAction),
}

impl From<CartAction> for Action {
    fn from(action: CartAction) -> Self {
        Action::Cart(action)
    }
}

impl From<FilterAction> for Action {
    fn from(action: FilterAction) -> Self {
        Action::Filter(action)
    }
}

/// Consistent view of both slices at one revision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Incremented once per state-changing dispatch
    pub revision: u64,
    pub cart: CartState,
    pub filter: FilterState,
}

type CartListener = Arc<dyn Fn(&CartState) + Send + Sync>;

struct StoreInner {
    state: RwLock<StoreSnapshot>,
    /// `None` once disposed; also serializes dispatches
    revision: Mutex<Option<watch::Sender<u64>>>,
    cart_listeners: RwLock<Vec<CartListener>>,
    selectors: Selectors,
}

/// Shared handle to the application store
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store with default slices
    pub fn create() -> Self {
        Self::with_state(CartState::default(), FilterState::default())
    }

    /// Create a store from existing slice states
    pub fn with_state(cart: CartState, filter: FilterState) -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreSnapshot {
                    revision: 0,
                    cart,
                    filter,
                }),
                revision: Mutex::new(Some(tx)),
                cart_listeners: RwLock::new(Vec::new()),
                selectors: Selectors::new(),
            }),
        }
    }

    /// Stop accepting dispatches and close every subscription
    pub fn dispose(&self) {
        if self.inner.revision.lock().take().is_some() {
            self.inner.cart_listeners.write().clear();
            debug!("store disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.revision.lock().is_none()
    }

    /// Apply a transition. Returns true when the state changed.
    ///
    /// Dispatches after [`dispose`](Self::dispose) are ignored.
    pub fn dispatch(&self, action: impl Into<Action>) -> bool {
        let action = action.into();
        let guard = self.inner.revision.lock();
        let Some(tx) = guard.as_ref() else {
            debug!(?action, "dispatch on disposed store ignored");
            return false;
        };

        let changed_cart = {
            let mut state = self.inner.state.write();
            let (changed, is_cart) = match action {
                Action::Cart(action) => (state.cart.apply(action), true),
                Action::Filter(action) => (state.filter.apply(action), false),
            };
            if !changed {
                return false;
            }
            state.revision += 1;
            tx.send_replace(state.revision);
            is_cart.then(|| state.cart.clone())
        };
        drop(guard);

        if let Some(cart) = changed_cart {
            let listeners = self.inner.cart_listeners.read().clone();
            for listener in listeners {
                listener(&cart);
            }
        }
        true
    }

    /// Receiver that yields the revision after each change; closed on dispose
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        match self.inner.revision.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => watch::channel(self.revision()).1,
        }
    }

    /// Call `listener` with the new cart after every cart change
    pub fn on_cart_change<F>(&self, listener: F)
    where
        F: Fn(&CartState) + Send + Sync + 'static,
    {
        self.inner.cart_listeners.write().push(Arc::new(listener));
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.state.read().clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.state.read().revision
    }

    pub fn cart(&self) -> CartState {
        self.inner.state.read().cart.clone()
    }

    pub fn filter(&self) -> FilterState {
        self.inner.state.read().filter.clone()
    }

    // Cart shortcuts

    pub fn add_to_cart(&self, product: Product) -> bool {
        self.dispatch(CartAction::Add(product))
    }

    pub fn update_quantity(&self, id: ProductId, quantity: i64) -> bool {
        self.dispatch(CartAction::UpdateQuantity { id, quantity })
    }

    pub fn remove_from_cart(&self, id: ProductId) -> bool {
        self.dispatch(CartAction::Remove(id))
    }

    pub fn clear_cart(&self) -> bool {
        self.dispatch(CartAction::Clear)
    }

    pub fn toggle_cart(&self) -> bool {
        self.dispatch(CartAction::Toggle)
    }

    /// Replace the cart lines, e.g. with a persisted cart
    pub fn hydrate_cart(&self, items: Vec<CartItem>) -> bool {
        self.dispatch(CartAction::Restore(items))
    }

    // Filter shortcuts

    pub fn set_selected_category(&self, category: impl Into<String>) -> bool {
        self.dispatch(FilterAction::SetSelectedCategory(category.into()))
    }

    pub fn set_search_term(&self, term: impl Into<String>) -> bool {
        self.dispatch(FilterAction::SetSearchTerm(term.into()))
    }

    /// Load the whole catalog into the filter slice.
    ///
    /// The outcome is also recorded in the slice: `loading` during the call,
    /// then either the products or the error message.
    pub async fn fetch_products<R>(&self, source: &R) -> Result<usize>
    where
        R: ProductSource + ?Sized,
    {
        self.dispatch(FilterAction::FetchPending);
        match source.fetch_all().await {
            Ok(products) => {
                let count = products.len();
                self.dispatch(FilterAction::FetchFulfilled(products));
                debug!(count, "products loaded into store");
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "product fetch failed");
                self.dispatch(FilterAction::FetchRejected(err.to_string()));
                Err(err)
            }
        }
    }

    // Memoized selectors

    pub fn selectors(&self) -> &Selectors {
        &self.inner.selectors
    }

    /// Apply the current filters to `products` (e.g. a cached product list)
    pub fn filter_products(&self, products: &Arc<Vec<Product>>) -> Arc<Vec<Product>> {
        let (category, search) = {
            let state = self.inner.state.read();
            (
                state.filter.selected_category.clone(),
                state.filter.search_term.clone(),
            )
        };
        self.inner
            .selectors
            .filtered_products(products, &category, &search)
    }

    /// Products from the filter slice that pass the current filters
    pub fn visible_products(&self) -> Arc<Vec<Product>> {
        let products = self.inner.state.read().filter.products.clone();
        self.filter_products(&products)
    }

    pub fn cart_total(&self) -> f64 {
        let items = self.inner.state.read().cart.items.clone();
        self.inner.selectors.cart_total(&items)
    }

    pub fn cart_item_count(&self) -> u32 {
        let items = self.inner.state.read().cart.items.clone();
        self.inner.selectors.cart_item_count(&items)
    }

    pub fn categories(&self) -> Arc<Vec<String>> {
        let products = self.inner.state.read().filter.products.clone();
        self.inner.selectors.categories(&products)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::create()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Store")
            .field("revision", &state.revision)
            .field("cart_items", &state.cart.items.len())
            .field("products", &state.filter.products.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogConfig, ProductRepository};
    use shophub_core::{Rating, ShopError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn product(id: ProductId, price: f64) -> Product {
        Product {
            id,
            title: format!("Product {id}"),
            price,
            description: String::new(),
            category: "electronics".into(),
            image: String::new(),
            rating: Rating { rate: 4.0, count: 10 },
        }
    }

    #[test]
    fn test_revision_counts_changes_only() {
        let store = Store::create();
        assert!(store.add_to_cart(product(1, 5.0)));
        assert!(!store.remove_from_cart(99));
        assert!(store.set_search_term("x"));
        assert!(!store.set_search_term("x"));
        assert_eq!(store.revision(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_wake_on_dispatch() {
        let store = Store::create();
        let mut rx = store.subscribe();

        store.add_to_cart(product(1, 5.0));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);

        store.dispose();
        assert!(rx.changed().await.is_err());
        assert!(!store.add_to_cart(product(2, 1.0)));
        assert_eq!(store.cart().item_count, 1);
    }

    #[test]
    fn test_cart_listeners() {
        let store = Store::create();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        store.on_cart_change(move |cart| {
            counter.store(cart.item_count as usize, Ordering::SeqCst);
        });

        store.add_to_cart(product(1, 5.0));
        store.add_to_cart(product(1, 5.0));
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        // Filter changes do not reach cart listeners
        store.set_selected_category("food");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_selectors_memoize_per_input() {
        let store = Store::create();
        store.add_to_cart(product(1, 2.5));
        store.update_quantity(1, 4);

        assert_eq!(store.cart_total(), 10.0);
        assert_eq!(store.cart_total(), 10.0);
        assert_eq!(store.cart_item_count(), 4);
        assert_eq!(store.selectors().recomputations().1, 1);

        store.toggle_cart();
        store.cart_total();
        assert_eq!(store.selectors().recomputations().1, 1);

        store.update_quantity(1, 1);
        assert_eq!(store.cart_total(), 2.5);
        assert_eq!(store.selectors().recomputations().1, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_products_legacy_path() {
        let repo = ProductRepository::demo(CatalogConfig::default());
        let store = Store::create();
        store.set_selected_category("food");

        let loaded = store.fetch_products(&repo).await.unwrap();
        assert_eq!(loaded, 56);

        let filter = store.filter();
        assert!(!filter.loading);
        assert_eq!(filter.products.len(), 56);
        assert_eq!(filter.categories[0], "all");
        assert!(filter.filtered_products.iter().all(|p| p.category == "food"));
        assert_eq!(*store.visible_products(), *filter.filtered_products);
    }

    struct Failing;

    #[async_trait::async_trait]
    impl ProductSource for Failing {
        async fn fetch_page(&self, _: u32, _: u32) -> Result<shophub_core::Page<Product>> {
            Err(ShopError::Fetch("offline".into()))
        }

        async fn fetch_by_id(&self, _: ProductId) -> Result<Product> {
            Err(ShopError::Fetch("offline".into()))
        }

        async fn fetch_all(&self) -> Result<Vec<Product>> {
            Err(ShopError::Fetch("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_fetch_products_records_error() {
        let store = Store::create();
        let err = store.fetch_products(&Failing).await.unwrap_err();
        let filter = store.filter();
        assert!(!filter.loading);
        assert_eq!(filter.error, Some(err.to_string()));
        assert!(filter.products.is_empty());
    }
}
