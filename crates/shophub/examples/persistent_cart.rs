use shophub::prelude::*;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("shophub.json");
    let config = StorefrontConfig::instant();

    println!("First session, state in {}", path.display());
    {
        let shop = Storefront::open(&path, config.clone())?;
        let coffee = shop.view_product(2).await?;
        let mat = shop.view_product(3).await?;
        shop.add_to_cart(coffee);
        shop.add_to_cart(mat.clone());
        shop.add_to_cart(mat);
        shop.store().toggle_cart();
        println!(
            "   cart: {} items, total {:.2}",
            shop.store().cart_item_count(),
            shop.store().cart_total()
        );
        shop.dispose();
    }

    println!("\nSecond session");
    let shop = Storefront::open(&path, config)?;
    let cart = shop.store().cart();
    for item in cart.items.iter() {
        println!("   {} x{}", item.product.title, item.quantity);
    }
    println!("   total {:.2}, drawer open: {}", cart.total, cart.is_open);

    if cart.item_count != 3 {
        panic!("Cart was not restored! Expected 3 items, got {}", cart.item_count);
    }
    println!("SUCCESS: cart restored from disk.");

    shop.dispose();
    Ok(())
}
