//! Cart line items

use serde::{Deserialize, Serialize};

use super::product::{Product, ProductId};

/// A product plus a quantity that is always at least 1 while present in a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// New line item with quantity 1
    pub fn new(product: Product) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    pub fn id(&self) -> ProductId {
        self.product.id
    }

    /// price x quantity
    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}
