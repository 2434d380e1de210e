//! Cart slice

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use shophub_core::{CartItem, Product, ProductId};

use super::selectors::{cart_item_count, cart_total};

/// Cart transitions
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Insert with quantity 1, or bump the quantity of an existing line
    Add(Product),
    /// Set a quantity; values at or below zero remove the line
    UpdateQuantity { id: ProductId, quantity: i64 },
    /// Remove a line if present
    Remove(ProductId),
    /// Empty the cart
    Clear,
    /// Flip panel visibility
    Toggle,
    /// Replace the lines wholesale, e.g. from persisted state
    Restore(Vec<CartItem>),
}

/// Cart contents with totals that always match `items`
#[derive(Debug, Clone, PartialEq)]
pub struct CartState {
    /// Lines in first-added order, one per product id
    pub items: Arc<Vec<CartItem>>,
    pub is_open: bool,
    pub total: f64,
    pub item_count: u32,
}

impl Default for CartState {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            is_open: false,
            total: 0.0,
            item_count: 0,
        }
    }
}

impl CartState {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Apply `action`. Returns false when the state did not change.
    ///
    /// Item lists are never edited in place: any change swaps in a new `Arc`,
    /// and actions that leave the items alone keep the old one.
    pub fn apply(&mut self, action: CartAction) -> bool {
        match action {
            CartAction::Add(product) => {
                let mut items = self.items.to_vec();
                match items.iter_mut().find(|item| item.id() == product.id) {
                    Some(item) => item.quantity = item.quantity.saturating_add(1),
                    None => items.push(CartItem::new(product)),
                }
                self.replace_items(items);
                true
            }
            CartAction::UpdateQuantity { id, quantity } => {
                let Some(position) = self.items.iter().position(|item| item.id() == id) else {
                    return false;
                };
                let quantity = quantity.clamp(0, i64::from(u32::MAX)) as u32;
                if self.items[position].quantity == quantity {
                    return false;
                }
                let mut items = self.items.to_vec();
                if quantity == 0 {
                    items.remove(position);
                } else {
                    items[position].quantity = quantity;
                }
                self.replace_items(items);
                true
            }
            CartAction::Remove(id) => {
                if self.get(id).is_none() {
                    return false;
                }
                let items = self
                    .items
                    .iter()
                    .filter(|item| item.id() != id)
                    .cloned()
                    .collect();
                self.replace_items(items);
                true
            }
            CartAction::Clear => {
                if self.items.is_empty() {
                    return false;
                }
                self.replace_items(Vec::new());
                true
            }
            CartAction::Toggle => {
                self.is_open = !self.is_open;
                true
            }
            CartAction::Restore(restored) => {
                let mut seen = HashSet::new();
                let items = restored
                    .into_iter()
                    .filter(|item| item.quantity > 0 && seen.insert(item.id()))
                    .collect();
                self.replace_items(items);
                true
            }
        }
    }

    fn replace_items(&mut self, items: Vec<CartItem>) {
        self.total = cart_total(&items);
        self.item_count = cart_item_count(&items);
        self.items = Arc::new(items);
    }

    /// Persistable form of this state
    pub fn to_saved(&self) -> SavedCart {
        SavedCart {
            items: self.items.to_vec(),
            is_open: self.is_open,
        }
    }
}

/// Cart as written to durable storage; totals are recomputed on restore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCart {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub is_open: bool,
}
