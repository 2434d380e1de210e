//! Structured query keys
//!
//! A key is an ordered list of typed segments, for example
//! `["products", "list", {"category": "all", "search": ""}]`. Two queries share
//! a cache slot iff their keys are structurally equal; invalidation matches on
//! leading segments.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::product::{ALL_CATEGORIES, ProductId};

/// Filter parameters carried by list and infinite keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductFilters {
    pub category: String,
    pub search: String,
}

impl Default for ProductFilters {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            search: String::new(),
        }
    }
}

impl ProductFilters {
    pub fn new(category: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            search: search.into(),
        }
    }

    /// Filters restricted to a category, no search term
    pub fn category(category: impl Into<String>) -> Self {
        Self::new(category, "")
    }

    /// Whether these filters select everything
    pub fn is_unfiltered(&self) -> bool {
        self.category == ALL_CATEGORIES && self.search.is_empty()
    }
}

/// Kind of product query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    List,
    Infinite,
    Detail,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::List => "list",
            QueryKind::Infinite => "infinite",
            QueryKind::Detail => "detail",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(QueryKind::List),
            "infinite" => Some(QueryKind::Infinite),
            "detail" => Some(QueryKind::Detail),
            _ => None,
        }
    }
}

/// One segment of a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegment {
    Name(String),
    Id(u64),
    Filters(ProductFilters),
}

impl From<&str> for KeySegment {
    fn from(s: &str) -> Self {
        KeySegment::Name(s.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(s: String) -> Self {
        KeySegment::Name(s)
    }
}

impl From<u64> for KeySegment {
    fn from(id: u64) -> Self {
        KeySegment::Id(id)
    }
}

impl From<ProductFilters> for KeySegment {
    fn from(filters: ProductFilters) -> Self {
        KeySegment::Filters(filters)
    }
}

impl From<QueryKind> for KeySegment {
    fn from(kind: QueryKind) -> Self {
        KeySegment::Name(kind.as_str().to_string())
    }
}

/// Structured, deep-equality cache key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    /// Create an empty key
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a segment
    pub fn part(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `prefix`'s segments equal this key's leading segments
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Logical resource name (first segment)
    pub fn resource(&self) -> Option<&str> {
        match self.0.first() {
            Some(KeySegment::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// Query kind (second segment)
    pub fn kind(&self) -> Option<QueryKind> {
        match self.0.get(1) {
            Some(KeySegment::Name(name)) => QueryKind::parse(name),
            _ => None,
        }
    }

    /// Filters carried by a list or infinite key
    pub fn filters(&self) -> Option<&ProductFilters> {
        self.0.iter().find_map(|segment| match segment {
            KeySegment::Filters(filters) => Some(filters),
            _ => None,
        })
    }

    /// Product id carried by a detail key
    pub fn product_id(&self) -> Option<ProductId> {
        match (self.kind(), self.0.get(2)) {
            (Some(QueryKind::Detail), Some(KeySegment::Id(id))) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// Key factory for the product resource
pub struct ProductKeys;

impl ProductKeys {
    pub const RESOURCE: &'static str = "products";

    /// `["products"]`
    pub fn all() -> QueryKey {
        QueryKey::new().part(Self::RESOURCE)
    }

    /// `["products", "list"]`
    pub fn lists() -> QueryKey {
        Self::all().part(QueryKind::List)
    }

    /// `["products", "list", {category, search}]`
    pub fn list(filters: ProductFilters) -> QueryKey {
        Self::lists().part(filters)
    }

    /// `["products", "infinite", {category, search}]`
    pub fn infinite(filters: ProductFilters) -> QueryKey {
        Self::all().part(QueryKind::Infinite).part(filters)
    }

    /// `["products", "detail"]`
    pub fn details() -> QueryKey {
        Self::all().part(QueryKind::Detail)
    }

    /// `["products", "detail", id]`
    pub fn detail(id: ProductId) -> QueryKey {
        Self::details().part(id)
    }
}
