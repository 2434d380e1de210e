//! shophub: Client-side storefront core
//!
//! # Features
//!
//! - **Data-fetch cache** with request de-duplication, stale-while-revalidate,
//!   retries with backoff, infinite pagination and prefix invalidation
//! - **Paginated product repository** over a deterministic demo catalog
//! - **Application store** with cart and filter slices and memoized selectors
//! - **Fail-soft persistence** for the cart, search history, browsing
//!   behavior and preferences
//! - **Cancellable timers** for debounced search and hover prefetch
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shophub::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let shop = Storefront::in_memory(StorefrontConfig::default());
//!
//!     let catalog = shop.infinite_products().await?;
//!     while catalog.fetch_next_page().await? {}
//!     println!("{} products", catalog.items()?.len());
//!
//!     let product = shop.view_product(1).await?;
//!     shop.add_to_cart(product);
//!     println!("cart total: {:.2}", shop.store().cart_total());
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod notify;
pub mod persist;
pub mod query;
pub mod schedule;
pub mod store;
mod storefront;

// Re-export core
pub use shophub_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use shophub_storage::{MemoryConfig, MemoryStorage};

#[cfg(feature = "file")]
pub use shophub_storage::{FileConfig, FileStorage};

pub use admin::CacheAdmin;
pub use catalog::{CatalogConfig, ProductRepository, ProductService};
pub use checkout::{OrderSummary, checkout};
pub use config::StorefrontConfig;
pub use notify::{ChannelNotifier, NoopNotifier, Notifier, Toast, ToastVariant, TracingNotifier};
pub use persist::{
    BehaviorConfig, BehaviorTracker, Persistence, Preferences, SearchEntry, SearchHistory,
    UserBehavior,
};
pub use query::{InfiniteQuery, QueryClient, QueryClientConfig, QueryObserver, QueryState};
pub use schedule::{Debouncer, Prefetcher, TimerHandle};
pub use store::{
    Action, CartAction, CartState, FilterAction, FilterState, Selectors, Store, StoreSnapshot,
};
pub use storefront::Storefront;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CartAction, CartItem, CartState, FilterAction, FilterState, InfiniteQuery, Page, Product,
        ProductFilters, ProductId, ProductKeys, ProductRepository, ProductService, ProductSource,
        QueryClient, QueryClientConfig, QueryKey, QueryOpts, QueryResult, Result, ShopError,
        Store, Storefront, StorefrontConfig,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryConfig, MemoryStorage};

    #[cfg(feature = "file")]
    pub use crate::{FileConfig, FileStorage};
}

#[cfg(test)]
mod tests;
