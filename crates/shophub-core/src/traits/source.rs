//! Product source trait

use async_trait::async_trait;

use crate::{Page, Product, ProductId, Result};

/// The single source of truth for which products exist
///
/// Implementations must be side-effect free: repeated or concurrent calls with
/// the same arguments return consistent results.
#[async_trait]
pub trait ProductSource: Send + Sync + 'static {
    /// Fetch the slice `[page * page_size, page * page_size + page_size)`.
    ///
    /// `next_page` is `None` once the slice reaches the end of the dataset.
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<Product>>;

    /// Fetch a single product, failing with `NotFound` for unknown ids
    async fn fetch_by_id(&self, id: ProductId) -> Result<Product>;

    /// Fetch the whole catalog in one call
    async fn fetch_all(&self) -> Result<Vec<Product>>;
}
