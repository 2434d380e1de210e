//! Error types for storefront operations

use thiserror::Error;

/// Main error type for all storefront operations
///
/// `Clone` so a single fetch result can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShopError {
    /// Requested product or resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient failure from a product source
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Durable storage read/write failed
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Caller passed an argument outside the accepted domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Work was cancelled before it produced a result
    #[error("operation cancelled")]
    Cancelled,

    /// Timeout
    #[error("operation timed out")]
    Timeout,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Whether the data-fetch cache should retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::Fetch(_) | ShopError::Timeout | ShopError::Internal(_)
        )
    }

    /// Shorthand for a product lookup miss
    pub fn product_not_found(id: u64) -> Self {
        ShopError::NotFound(format!("product {}", id))
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            ShopError::Deserialization(err.to_string())
        } else {
            ShopError::Serialization(err.to_string())
        }
    }
}

/// Result type alias for storefront operations
pub type Result<T> = std::result::Result<T, ShopError>;
