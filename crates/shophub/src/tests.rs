//! Integration tests for the storefront core

#[cfg(test)]
mod tests {
    use crate::CatalogConfig;
    use crate::prelude::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready};

    fn demo_service(config: CatalogConfig) -> ProductService<ProductRepository> {
        let page_size = config.page_size;
        let repo = ProductRepository::demo(config);
        ProductService::new(QueryClient::new(), Arc::new(repo), page_size)
    }

    #[tokio::test(start_paused = true)]
    async fn test_paging_through_the_whole_catalog() {
        let service = demo_service(CatalogConfig::default());
        let query = service
            .infinite_products(ProductFilters::default())
            .await
            .unwrap();

        let first = &query.pages().unwrap()[0];
        assert_eq!(first.items.len(), 12);
        assert_eq!(first.next_page, Some(1));

        for _ in 0..4 {
            assert!(query.fetch_next_page().await.unwrap());
        }
        let sizes: Vec<usize> = query
            .pages()
            .unwrap()
            .iter()
            .map(|page| page.items.len())
            .collect();
        assert_eq!(sizes, vec![12, 12, 12, 12, 8]);
        assert_eq!(query.pages().unwrap()[4].next_page, None);
        assert_eq!(query.items().unwrap().len(), 56);
        assert!(!query.has_next_page());

        // Sixth call: nothing left to load
        assert!(!query.fetch_next_page().await.unwrap());
        assert_eq!(query.pages().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_queries_share_one_fetch() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(vec![1u64, 2, 3])
                }
            }
        };

        let key = ProductKeys::list(ProductFilters::default());
        let (a, b) = tokio::join!(
            client.query(key.clone(), fetch.clone(), QueryOpts::new()),
            client.query(key.clone(), fetch, QueryOpts::new()),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().value(), vec![1, 2, 3]);
        assert_eq!(b.unwrap().value(), vec![1, 2, 3]);
        assert_eq!(client.stats().coalesced, 1);
    }

    #[tokio::test]
    async fn test_query_stays_pending_until_fetch_resolves() {
        let client = QueryClient::new();
        let key = ProductKeys::detail(1);
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();
        let rx = Arc::new(Mutex::new(Some(rx)));

        let mut query = tokio_test::task::spawn(client.query(
            key.clone(),
            move || {
                let rx = rx.lock().take();
                async move {
                    match rx {
                        Some(rx) => rx.await.map_err(|_| ShopError::Cancelled),
                        None => Err(ShopError::Internal("fetched twice".into())),
                    }
                }
            },
            QueryOpts::new().no_retry(),
        ));

        assert_pending!(query.poll());
        assert!(client.is_fetching(&key));

        tx.send(5).unwrap();
        assert!(query.is_woken());
        let result = assert_ready!(query.poll()).unwrap();
        assert_eq!(result, QueryResult::Fetched(5));
        assert!(!client.is_fetching(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_detail_served_then_refreshed() {
        let service = demo_service(CatalogConfig::instant());
        assert!(service.product(2).await.unwrap().is_fetched());
        assert!(service.product(2).await.unwrap().is_hit());

        tokio::time::advance(ProductService::<ProductRepository>::DETAIL_STALE_TIME).await;
        let stale = service.product(2).await.unwrap();
        assert!(stale.is_stale());
        assert_eq!(stale.get().title, "Premium Coffee Beans");

        // Background refetch lands shortly after
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(service.product(2).await.unwrap().is_hit());
        let state = service
            .client()
            .query_state(&ProductKeys::detail(2))
            .unwrap();
        assert_eq!(state.fetch_count, 2);
    }

    #[test]
    fn test_cart_totals_hold_through_the_store() {
        let repo = ProductRepository::demo(CatalogConfig::instant());
        let products = repo.products();
        let store = Store::create();

        store.add_to_cart(products[0].clone());
        store.add_to_cart(products[0].clone());
        store.add_to_cart(products[1].clone());
        store.update_quantity(products[1].id, 3);
        store.add_to_cart(products[2].clone());
        store.remove_from_cart(products[0].id);
        store.update_quantity(products[2].id, -5);
        store.update_quantity(products[2].id, -5);

        let cart = store.cart();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.item_count, 3);
        assert_eq!(cart.total, products[1].price * 3.0);
        assert_eq!(store.cart_total(), cart.total);
        assert_eq!(store.cart_item_count(), cart.item_count);
    }

    #[test]
    fn test_adding_twice_makes_one_line() {
        let product = ProductRepository::demo(CatalogConfig::instant()).products()[3].clone();
        let store = Store::create();
        store.add_to_cart(product.clone());
        store.add_to_cart(product.clone());

        let cart = store.cart();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total, product.price * 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_compose_over_the_demo_catalog() {
        let repo = ProductRepository::demo(CatalogConfig::instant());
        let store = Store::create();
        store.fetch_products(&repo).await.unwrap();

        store.set_selected_category("electronics");
        store.set_search_term("pro");
        let both = store.visible_products();
        assert!(!both.is_empty());
        assert!(both.iter().all(|p| p.category == "electronics"));
        assert!(both.iter().all(|p| p.matches_search("pro")));
        // Featured electronics (ids 1 and 4) do not mention "pro"
        assert!(both.iter().all(|p| p.id != 1 && p.id != 4));

        store.set_search_term("");
        let category_only = store.visible_products();
        let expected: Vec<ProductId> = repo
            .products()
            .iter()
            .filter(|p| p.category == "electronics")
            .map(|p| p.id)
            .collect();
        assert_eq!(
            category_only.iter().map(|p| p.id).collect::<Vec<_>>(),
            expected
        );
        assert!(expected.contains(&1) && expected.contains(&4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_history_through_the_storefront() {
        let shop = Storefront::in_memory(StorefrontConfig::instant().without_gc());
        shop.load_products().await.unwrap();

        for i in 0..11 {
            shop.search(format!("query {i}"));
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        let terms = shop.history().terms();
        assert_eq!(terms.len(), 10);
        assert_eq!(terms[0], "query 10");
        assert!(!terms.contains(&"query 0".to_string()));

        shop.search("query 5");
        tokio::time::sleep(Duration::from_millis(400)).await;
        let terms = shop.history().terms();
        assert_eq!(terms.len(), 10);
        assert_eq!(terms[0], "query 5");
        assert_eq!(terms.iter().filter(|t| *t == "query 5").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_refetches_observed_queries() {
        let service = demo_service(CatalogConfig::instant());
        service.products(ProductFilters::default()).await.unwrap();
        let key = ProductKeys::list(ProductFilters::default());
        let mut observer = service.client().observe(key.clone());

        assert_eq!(service.invalidate_products(), 1);
        observer.changed().await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let state = observer.state().unwrap();
        assert!(!state.is_stale);
        assert_eq!(state.fetch_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_product_is_terminal() {
        let service = demo_service(CatalogConfig::instant());
        let err = service.product(999).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
        let state = service
            .client()
            .query_state(&ProductKeys::detail(999))
            .unwrap();
        assert_eq!(state.failure_count, 1);
    }
}
