//! Core types for the storefront

mod cart;
mod entry;
mod key;
mod options;
mod page;
mod product;
mod result;
mod stats;

pub use cart::CartItem;
pub use entry::{QueryEntry, QueryStatus};
pub use key::{KeySegment, ProductFilters, ProductKeys, QueryKey, QueryKind};
pub use options::{Backoff, QueryOptions, QueryOpts, RetryPolicy};
pub use page::{Cursor, InfiniteData, Page};
pub use product::{ALL_CATEGORIES, Product, ProductId, Rating};
pub use result::QueryResult;
pub use stats::QueryStats;
