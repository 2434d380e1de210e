//! shophub-core: Core traits and types for the shophub storefront
//!
//! This crate provides the data model (products, cart items, pages), the
//! structured query keys and query state used by the data-fetch cache, and
//! the seams the rest of the workspace plugs into.

mod error;
mod traits;
mod types;

pub use error::{Result, ShopError};
pub use traits::*;
pub use types::*;
