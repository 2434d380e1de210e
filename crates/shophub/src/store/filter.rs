//! Filter slice
//!
//! Holds the category and search filters plus the product list loaded through
//! the legacy fetch path. `filtered_products` is recomputed on every change to
//! any of its inputs.

use std::sync::Arc;

use shophub_core::{ALL_CATEGORIES, Product};

use super::selectors::{categories, filter_products};

/// Message stored when a fetch fails without a usable error text
pub const FETCH_FAILED: &str = "Failed to fetch products";

/// Filter transitions
#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    SetSelectedCategory(String),
    SetSearchTerm(String),
    /// Legacy fetch started
    FetchPending,
    /// Legacy fetch resolved with the full catalog
    FetchFulfilled(Vec<Product>),
    /// Legacy fetch failed with the given message
    FetchRejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub selected_category: String,
    pub search_term: String,
    pub products: Arc<Vec<Product>>,
    pub filtered_products: Arc<Vec<Product>>,
    /// `"all"` plus the distinct categories of `products`
    pub categories: Arc<Vec<String>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_category: ALL_CATEGORIES.to_string(),
            search_term: String::new(),
            products: Arc::new(Vec::new()),
            filtered_products: Arc::new(Vec::new()),
            categories: Arc::new(vec![ALL_CATEGORIES.to_string()]),
            loading: false,
            error: None,
        }
    }
}

impl FilterState {
    /// Apply `action`. Returns false when the state did not change.
    pub fn apply(&mut self, action: FilterAction) -> bool {
        match action {
            FilterAction::SetSelectedCategory(category) => {
                if self.selected_category == category {
                    return false;
                }
                self.selected_category = category;
                self.refilter();
            }
            FilterAction::SetSearchTerm(term) => {
                if self.search_term == term {
                    return false;
                }
                self.search_term = term;
                self.refilter();
            }
            FilterAction::FetchPending => {
                self.loading = true;
                self.error = None;
            }
            FilterAction::FetchFulfilled(products) => {
                self.loading = false;
                self.categories = Arc::new(categories(&products));
                self.products = Arc::new(products);
                self.refilter();
            }
            FilterAction::FetchRejected(message) => {
                self.loading = false;
                self.error = Some(if message.is_empty() {
                    FETCH_FAILED.to_string()
                } else {
                    message
                });
            }
        }
        true
    }

    fn refilter(&mut self) {
        self.filtered_products = Arc::new(filter_products(
            &self.products,
            &self.selected_category,
            &self.search_term,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shophub_core::Rating;

    fn product(id: u64, title: &str, category: &str) -> Product {
        Product {
            id,
            title: title.to_string(),
            price: 10.0,
            description: String::new(),
            category: category.to_string(),
            image: String::new(),
            rating: Rating { rate: 4.0, count: 1 },
        }
    }

    fn loaded() -> FilterState {
        let mut state = FilterState::default();
        state.apply(FilterAction::FetchPending);
        state.apply(FilterAction::FetchFulfilled(vec![
            product(1, "Pro Headphones", "electronics"),
            product(2, "Coffee", "food"),
            product(3, "Stand", "electronics"),
        ]));
        state
    }

    #[test]
    fn test_defaults() {
        let state = FilterState::default();
        assert_eq!(state.selected_category, "all");
        assert_eq!(state.search_term, "");
        assert_eq!(*state.categories, vec!["all"]);
        assert!(!state.loading);
    }

    #[test]
    fn test_fulfilled_fills_lists() {
        let state = loaded();
        assert!(!state.loading);
        assert_eq!(state.products.len(), 3);
        assert_eq!(state.filtered_products.len(), 3);
        assert_eq!(*state.categories, vec!["all", "electronics", "food"]);
    }

    #[test]
    fn test_setters_refilter() {
        let mut state = loaded();
        state.apply(FilterAction::SetSelectedCategory("electronics".into()));
        assert_eq!(state.filtered_products.len(), 2);

        state.apply(FilterAction::SetSearchTerm("PRO".into()));
        let ids: Vec<_> = state.filtered_products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);

        assert!(!state.apply(FilterAction::SetSearchTerm("PRO".into())));
    }

    #[test]
    fn test_fulfilled_keeps_active_filters() {
        let mut state = FilterState::default();
        state.apply(FilterAction::SetSelectedCategory("food".into()));
        state.apply(FilterAction::FetchFulfilled(vec![
            product(1, "a", "electronics"),
            product(2, "b", "food"),
        ]));
        assert_eq!(state.filtered_products.len(), 1);
        assert_eq!(state.filtered_products[0].id, 2);
    }

    #[test]
    fn test_rejected_sets_error() {
        let mut state = FilterState::default();
        state.apply(FilterAction::FetchPending);
        state.apply(FilterAction::FetchRejected(String::new()));
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED));

        state.apply(FilterAction::FetchPending);
        assert_eq!(state.error, None);
        state.apply(FilterAction::FetchRejected("timeout".into()));
        assert_eq!(state.error.as_deref(), Some("timeout"));
    }
}
