//! Demo checkout: no payment provider, just the hand-off delay

use serde::Serialize;
use std::time::Duration;
use tracing::info;

use shophub_core::{CartItem, Result, ShopError};

use crate::notify::{Notifier, Toast};
use crate::store::Store;

/// What was checked out
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub total: f64,
}

/// Check out the current cart.
///
/// Waits `delay`, announces the demo hand-off, then empties the cart. An
/// empty cart fails with `InvalidArgument` and a destructive toast.
pub async fn checkout(
    store: &Store,
    notifier: &dyn Notifier,
    delay: Duration,
) -> Result<OrderSummary> {
    let cart = store.cart();
    if cart.is_empty() {
        notifier.notify(Toast::destructive(
            "Error",
            "Failed to initialize checkout. Your cart is empty.",
        ));
        return Err(ShopError::InvalidArgument("cart is empty".into()));
    }

    let summary = OrderSummary {
        items: cart.items.to_vec(),
        item_count: cart.item_count,
        total: cart.total,
    };

    tokio::time::sleep(delay).await;
    notifier.notify(Toast::new(
        "Checkout Demo",
        "This is a demo checkout. In a real app, you'd be redirected to a payment provider.",
    ));
    store.clear_cart();
    info!(
        items = summary.items.len(),
        item_count = summary.item_count,
        total = summary.total,
        "checkout completed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChannelNotifier;
    use shophub_core::{Product, Rating};
    use tokio::time::Instant;

    fn product(id: u64, price: f64) -> Product {
        Product {
            id,
            title: format!("Product {id}"),
            price,
            description: String::new(),
            category: "food".into(),
            image: String::new(),
            rating: Rating { rate: 3.5, count: 2 },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_clears_cart_after_delay() {
        let store = Store::create();
        store.add_to_cart(product(1, 10.0));
        store.add_to_cart(product(1, 10.0));
        store.add_to_cart(product(2, 4.5));
        let (notifier, mut toasts) = ChannelNotifier::new();

        let started = Instant::now();
        let summary = checkout(&store, &notifier, Duration::from_secs(2))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.total, 24.5);
        assert_eq!(summary.items.len(), 2);
        assert!(store.cart().is_empty());

        let toast = toasts.try_recv().unwrap();
        assert_eq!(toast.title, "Checkout Demo");
        assert!(!toast.is_destructive());
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let store = Store::create();
        let (notifier, mut toasts) = ChannelNotifier::new();

        let err = checkout(&store, &notifier, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidArgument(_)));

        let toast = toasts.try_recv().unwrap();
        assert_eq!(toast.title, "Error");
        assert!(toast.is_destructive());
    }
}
