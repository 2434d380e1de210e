//! Derived views over store and cache data
//!
//! The free functions are the pure computations. [`Selectors`] wraps each in a
//! [`Memo`] that keeps only the last call and recomputes when any input
//! changes identity (collections) or value (strings).

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use shophub_core::{ALL_CATEGORIES, CartItem, Product};

/// Products passing both the category and the search filter
pub fn filter_products(products: &[Product], category: &str, search: &str) -> Vec<Product> {
    let needle = search.to_lowercase();
    products
        .iter()
        .filter(|product| product.in_category(category))
        .filter(|product| needle.is_empty() || product.matches_search(&needle))
        .cloned()
        .collect()
}

/// Sum of price x quantity
pub fn cart_total(items: &[CartItem]) -> f64 {
    items.iter().map(CartItem::line_total).sum()
}

/// Sum of quantities
pub fn cart_item_count(items: &[CartItem]) -> u32 {
    items
        .iter()
        .fold(0u32, |count, item| count.saturating_add(item.quantity))
}

/// `"all"` followed by each distinct category in first-seen order
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(
            products
                .iter()
                .filter(|product| seen.insert(product.category.as_str()))
                .map(|product| product.category.clone()),
        )
        .collect()
}

/// Compares an `Arc` by address rather than by value
#[derive(Debug)]
pub struct ByAddress<T>(pub Arc<T>);

impl<T> Clone for ByAddress<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for ByAddress<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

struct MemoState<K, V> {
    last: Option<(K, V)>,
    recomputations: u64,
}

/// Single-slot memoization: remembers the last inputs and output only
pub struct Memo<K, V> {
    state: Mutex<MemoState<K, V>>,
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoState {
                last: None,
                recomputations: 0,
            }),
        }
    }

    /// Return the cached output when `key` equals the last inputs, otherwise
    /// compute, remember and return a new one
    pub fn get_or_compute<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        let mut state = self.state.lock();
        if let Some((last_key, value)) = &state.last {
            if *last_key == key {
                return value.clone();
            }
        }
        let value = compute(&key);
        state.last = Some((key, value.clone()));
        state.recomputations += 1;
        value
    }

    /// How many times the output was computed
    pub fn recomputations(&self) -> u64 {
        self.state.lock().recomputations
    }

    /// Forget the remembered call
    pub fn reset(&self) {
        self.state.lock().last = None;
    }
}

impl<K: PartialEq, V: Clone> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

type FilterKey = (ByAddress<Vec<Product>>, String, String);

/// Memoized selectors
#[derive(Default)]
pub struct Selectors {
    filtered: Memo<FilterKey, Arc<Vec<Product>>>,
    total: Memo<ByAddress<Vec<CartItem>>, f64>,
    item_count: Memo<ByAddress<Vec<CartItem>>, u32>,
    categories: Memo<ByAddress<Vec<Product>>, Arc<Vec<String>>>,
}

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered_products(
        &self,
        products: &Arc<Vec<Product>>,
        category: &str,
        search: &str,
    ) -> Arc<Vec<Product>> {
        let key = (
            ByAddress(products.clone()),
            category.to_string(),
            search.to_string(),
        );
        self.filtered.get_or_compute(key, |(products, category, search)| {
            Arc::new(filter_products(&products.0, category, search))
        })
    }

    pub fn cart_total(&self, items: &Arc<Vec<CartItem>>) -> f64 {
        self.total
            .get_or_compute(ByAddress(items.clone()), |items| cart_total(&items.0))
    }

    pub fn cart_item_count(&self, items: &Arc<Vec<CartItem>>) -> u32 {
        self.item_count
            .get_or_compute(ByAddress(items.clone()), |items| cart_item_count(&items.0))
    }

    pub fn categories(&self, products: &Arc<Vec<Product>>) -> Arc<Vec<String>> {
        self.categories
            .get_or_compute(ByAddress(products.clone()), |products| {
                Arc::new(categories(&products.0))
            })
    }

    /// Recomputation counters: (filtered, total, item count, categories)
    pub fn recomputations(&self) -> (u64, u64, u64, u64) {
        (
            self.filtered.recomputations(),
            self.total.recomputations(),
            self.item_count.recomputations(),
            self.categories.recomputations(),
        )
    }
}
