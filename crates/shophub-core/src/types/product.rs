//! Product catalog records

use serde::{Deserialize, Serialize};

/// Primary key of a product
pub type ProductId = u64;

/// Category sentinel meaning "no category filter"
pub const ALL_CATEGORIES: &str = "all";

/// Aggregate customer rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Average score, 0.0 to 5.0
    pub rate: f64,
    /// Number of ratings
    pub count: u32,
}

/// Immutable product record, created by a product source and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Non-negative unit price
    pub price: f64,
    pub description: String,
    pub category: String,
    pub image: String,
    pub rating: Rating,
}

impl Product {
    /// Case-insensitive substring match against title or description.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }

    /// Whether this product belongs to `category` (`"all"` matches everything)
    pub fn in_category(&self, category: &str) -> bool {
        category == ALL_CATEGORIES || self.category == category
    }
}
