//! Product catalog: the in-process product source and its query helpers

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use shophub_core::{
    JsonSerializer, NoopMetrics, Page, Product, ProductFilters, ProductId, ProductKeys,
    ProductSource, QueryMetrics, QueryOpts, QueryResult, Rating, Result, Serializer, ShopError,
};

use crate::query::{InfiniteQuery, QueryClient};

/// Categories used by generated demo products
pub const DEMO_CATEGORIES: [&str; 4] = ["electronics", "food", "accessories", "fitness"];

/// Configuration for ProductRepository
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Products per page for paged listings
    pub page_size: u32,
    /// Simulated latency of `fetch_page`
    pub page_latency: Duration,
    /// Simulated latency of `fetch_by_id`
    pub detail_latency: Duration,
    /// Simulated latency of `fetch_all`
    pub all_latency: Duration,
    /// Seed for generated demo products
    pub seed: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 12,
            page_latency: Duration::from_millis(800),
            detail_latency: Duration::from_millis(500),
            all_latency: Duration::from_millis(1000),
            seed: 7,
        }
    }
}

impl CatalogConfig {
    /// Config with every latency set to zero
    pub fn instant() -> Self {
        Self {
            page_latency: Duration::ZERO,
            detail_latency: Duration::ZERO,
            all_latency: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Read-only product dataset answering paged and single-product lookups
///
/// Cloning shares the dataset.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    products: Arc<Vec<Product>>,
    config: CatalogConfig,
}

impl ProductRepository {
    /// Build a repository over `products` in the given order.
    ///
    /// Fails when two products share an id.
    pub fn new(products: Vec<Product>, config: CatalogConfig) -> Result<Self> {
        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            if !seen.insert(product.id) {
                return Err(ShopError::InvalidArgument(format!(
                    "duplicate product id {}",
                    product.id
                )));
            }
        }
        Ok(Self {
            products: Arc::new(products),
            config,
        })
    }

    /// The 56-product demo catalog: six featured products and fifty generated ones
    pub fn demo(config: CatalogConfig) -> Self {
        let products = demo_products(config.seed);
        Self {
            products: Arc::new(products),
            config,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All products in canonical order, without latency
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    async fn simulate(&self, latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ProductSource for ProductRepository {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<Product>> {
        if page_size == 0 {
            return Err(ShopError::InvalidArgument("page size must be positive".into()));
        }
        self.simulate(self.config.page_latency).await;

        let total = self.products.len();
        let start = (page as usize).saturating_mul(page_size as usize).min(total);
        let end = start.saturating_add(page_size as usize).min(total);
        // Lazy so the last possible page never computes a successor
        let next_page = (end < total).then(|| page + 1);

        debug!(page, page_size, items = end - start, ?next_page, "served product page");
        Ok(Page {
            items: self.products[start..end].to_vec(),
            next_page,
        })
    }

    async fn fetch_by_id(&self, id: ProductId) -> Result<Product> {
        self.simulate(self.config.detail_latency).await;
        self.products
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .ok_or_else(|| ShopError::product_not_found(id))
    }

    async fn fetch_all(&self) -> Result<Vec<Product>> {
        self.simulate(self.config.all_latency).await;
        Ok(self.products.to_vec())
    }
}

fn featured(
    id: ProductId,
    title: &str,
    price: f64,
    description: &str,
    category: &str,
    photo: &str,
    rating: Rating,
) -> Product {
    Product {
        id,
        title: title.to_string(),
        price,
        description: description.to_string(),
        category: category.to_string(),
        image: format!("https://images.unsplash.com/photo-{photo}?w=500&h=500&fit=crop"),
        rating,
    }
}

/// Six featured products followed by fifty generated from `seed`
pub fn demo_products(seed: u64) -> Vec<Product> {
    let mut products = vec![
        featured(
            1,
            "Wireless Bluetooth Headphones",
            79.99,
            "High-quality wireless headphones with noise cancellation and 30-hour battery life.",
            "electronics",
            "1505740420928-5e560c06d30e",
            Rating { rate: 4.5, count: 120 },
        ),
        featured(
            2,
            "Premium Coffee Beans",
            24.99,
            "Organic single-origin coffee beans roasted to perfection.",
            "food",
            "1559056199-641a0ac8b55e",
            Rating { rate: 4.8, count: 89 },
        ),
        featured(
            3,
            "Minimalist Watch",
            199.99,
            "Elegant minimalist watch with leather strap and Swiss movement.",
            "accessories",
            "1523275335684-37898b6baf30",
            Rating { rate: 4.3, count: 156 },
        ),
        featured(
            4,
            "Smartphone Stand",
            15.99,
            "Adjustable smartphone stand for desk use with anti-slip base.",
            "electronics",
            "1512941937669-90a1b58e7e9c",
            Rating { rate: 4.1, count: 203 },
        ),
        featured(
            5,
            "Yoga Mat",
            39.99,
            "Eco-friendly yoga mat with superior grip and cushioning.",
            "fitness",
            "1544367567-0f2fcb009e0b",
            Rating { rate: 4.6, count: 78 },
        ),
        featured(
            6,
            "Leather Backpack",
            129.99,
            "Vintage leather backpack with multiple compartments and laptop sleeve.",
            "accessories",
            "1553062407-98eeb64c6a62",
            Rating { rate: 4.4, count: 92 },
        ),
    ];

    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..50u64 {
        let id = i + 7;
        let rate = ((rng.random::<f64>() * 2.0 + 3.0) * 10.0).round() / 10.0;
        products.push(Product {
            id,
            title: format!("Product {id}"),
            price: f64::from(rng.random_range(10..210u32)),
            description: format!(
                "Description for product {id}. High-quality item with excellent features."
            ),
            category: DEMO_CATEGORIES[rng.random_range(0..DEMO_CATEGORIES.len())].to_string(),
            image: format!(
                "https://images.unsplash.com/photo-{}?w=500&h=500&fit=crop",
                1_500_000_000_000u64 + i
            ),
            rating: Rating {
                rate,
                count: rng.random_range(20..220),
            },
        });
    }
    products
}

/// Product queries wired to a [`QueryClient`] under the [`ProductKeys`] layout
pub struct ProductService<R, S = JsonSerializer, M = NoopMetrics>
where
    R: ProductSource,
    S: Serializer,
    M: QueryMetrics,
{
    client: QueryClient<S, M>,
    source: Arc<R>,
    page_size: u32,
}

impl<R, S, M> ProductService<R, S, M>
where
    R: ProductSource,
    S: Serializer,
    M: QueryMetrics,
{
    /// Stale window for single-product queries
    pub const DETAIL_STALE_TIME: Duration = Duration::from_secs(10 * 60);

    pub fn new(client: QueryClient<S, M>, source: Arc<R>, page_size: u32) -> Self {
        Self {
            client,
            source,
            page_size,
        }
    }

    pub fn client(&self) -> &QueryClient<S, M> {
        &self.client
    }

    pub fn source(&self) -> &Arc<R> {
        &self.source
    }

    /// Whole catalog under `["products", "list", filters]`.
    ///
    /// The fetch ignores `filters`; they only select the cache slot.
    pub async fn products(&self, filters: ProductFilters) -> Result<QueryResult<Vec<Product>>> {
        let source = self.source.clone();
        self.client
            .query(
                ProductKeys::list(filters),
                move || {
                    let source = source.clone();
                    async move { source.fetch_all().await }
                },
                QueryOpts::new(),
            )
            .await
    }

    /// Paged catalog under `["products", "infinite", filters]`, first page loaded
    pub async fn infinite_products(
        &self,
        filters: ProductFilters,
    ) -> Result<InfiniteQuery<Page<Product>, S, M>> {
        let source = self.source.clone();
        let page_size = self.page_size;
        self.client
            .infinite_query(
                ProductKeys::infinite(filters),
                move |page| {
                    let source = source.clone();
                    async move { source.fetch_page(page, page_size).await }
                },
                |page: &Page<Product>| page.next_page,
                QueryOpts::new().initial_page(0),
            )
            .await
    }

    /// One product under `["products", "detail", id]`
    pub async fn product(&self, id: ProductId) -> Result<QueryResult<Product>> {
        let source = self.source.clone();
        self.client
            .query(
                ProductKeys::detail(id),
                move || {
                    let source = source.clone();
                    async move { source.fetch_by_id(id).await }
                },
                QueryOpts::new().stale_time(Self::DETAIL_STALE_TIME),
            )
            .await
    }

    /// Warm the detail entry for `id`
    pub async fn prefetch_product(&self, id: ProductId) {
        let source = self.source.clone();
        self.client
            .prefetch(
                ProductKeys::detail(id),
                move || {
                    let source = source.clone();
                    async move { source.fetch_by_id(id).await }
                },
                QueryOpts::new().stale_time(Self::DETAIL_STALE_TIME),
            )
            .await;
    }

    /// Warm the unfiltered catalog list
    pub async fn prefetch_products(&self) {
        let source = self.source.clone();
        self.client
            .prefetch(
                ProductKeys::list(ProductFilters::default()),
                move || {
                    let source = source.clone();
                    async move { source.fetch_all().await }
                },
                QueryOpts::new(),
            )
            .await;
    }

    /// Warm the first page of the paged catalog for `filters`
    pub async fn prefetch_infinite_products(&self, filters: ProductFilters) {
        let source = self.source.clone();
        let page_size = self.page_size;
        self.client
            .prefetch_infinite(
                ProductKeys::infinite(filters),
                move |page| {
                    let source = source.clone();
                    async move { source.fetch_page(page, page_size).await }
                },
                |page: &Page<Product>| page.next_page,
                QueryOpts::new(),
            )
            .await;
    }

    /// Mark every product query stale
    pub fn invalidate_products(&self) -> usize {
        self.client.invalidate(&ProductKeys::all())
    }
}

impl<R, S, M> Clone for ProductService<R, S, M>
where
    R: ProductSource,
    S: Serializer,
    M: QueryMetrics,
{
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            source: self.source.clone(),
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn repository() -> ProductRepository {
        ProductRepository::demo(CatalogConfig::default())
    }

    #[test]
    fn test_demo_catalog_shape() {
        let repo = repository();
        assert_eq!(repo.len(), 56);

        let ids: Vec<ProductId> = repo.products().iter().map(|p| p.id).collect();
        assert_eq!(ids, (1..=56).collect::<Vec<_>>());

        for product in &repo.products()[6..] {
            assert!(DEMO_CATEGORIES.contains(&product.category.as_str()));
            assert!((10.0..210.0).contains(&product.price));
            assert!((3.0..=5.0).contains(&product.rating.rate));
        }
    }

    #[test]
    fn test_demo_catalog_is_deterministic() {
        assert_eq!(demo_products(42), demo_products(42));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let products = demo_products(1)[..2].to_vec();
        let mut doubled = products.clone();
        doubled.extend(products);
        assert!(matches!(
            ProductRepository::new(doubled, CatalogConfig::instant()),
            Err(ShopError::InvalidArgument(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_and_end_signal() {
        let repo = repository();
        let started = Instant::now();
        let first = repo.fetch_page(0, 12).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(800));
        assert_eq!(first.items.len(), 12);
        assert_eq!(first.next_page, Some(1));

        let last = repo.fetch_page(4, 12).await.unwrap();
        assert_eq!(last.items.len(), 8);
        assert_eq!(last.next_page, None);
        assert_eq!(last.items[0].id, 49);

        let beyond = repo.fetch_page(9, 12).await.unwrap();
        assert!(beyond.items.is_empty());
        assert!(beyond.is_last());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_page_number_is_past_the_end() {
        let repo = repository();
        let page = repo.fetch_page(u32::MAX, 12).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next_page, None);

        let page = repo.fetch_page(u32::MAX, u32::MAX).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_page_size_rejected() {
        let err = repository().fetch_page(0, 0).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidArgument(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_by_id() {
        let repo = repository();
        let product = repo.fetch_by_id(3).await.unwrap();
        assert_eq!(product.title, "Minimalist Watch");

        let err = repo.fetch_by_id(999).await.unwrap_err();
        assert_eq!(err, ShopError::product_not_found(999));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_pages_are_consistent() {
        let repo = repository();
        let (a, b) = tokio::join!(repo.fetch_page(2, 12), repo.fetch_page(2, 12));
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_detail_uses_long_stale_window() {
        let service = ProductService::new(QueryClient::new(), Arc::new(repository()), 12);
        assert!(service.product(1).await.unwrap().is_fetched());

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        assert!(service.product(1).await.unwrap().is_hit());

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert!(service.product(1).await.unwrap().is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_unknown_product_is_terminal() {
        let service = ProductService::new(QueryClient::new(), Arc::new(repository()), 12);
        let started = Instant::now();
        let err = service.product(404).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
        // One attempt, no backoff
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
