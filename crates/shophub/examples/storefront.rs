use shophub::prelude::*;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let shop = Storefront::in_memory(StorefrontConfig::default());

    println!("\nLoading the catalog page by page...");
    let catalog = shop.infinite_products().await?;
    while catalog.fetch_next_page().await? {
        println!("   {} products loaded", catalog.items()?.len());
    }

    let all = shop.load_products().await?;
    println!("\nCategories: {:?}", shophub::store::selectors::categories(&all));
    println!("Loaded {} products", all.len());

    println!("\nFiltering to electronics and searching for \"wire\"...");
    shop.set_category("electronics");
    shop.search("w");
    shop.search("wi");
    shop.search("wire");
    tokio::time::sleep(shop.config().debounce_delay + Duration::from_millis(50)).await;
    for product in shop.visible_products().iter() {
        println!("   #{} {} ({:.2})", product.id, product.title, product.price);
    }
    println!("Search history: {:?}", shop.history().terms());

    println!("\nViewing a product and adding it to the cart...");
    let product = shop.view_product(1).await?;
    shop.add_to_cart(product.clone());
    shop.add_to_cart(product);
    shop.leave_product();
    println!(
        "   {} items, total {:.2}",
        shop.store().cart_item_count(),
        shop.store().cart_total()
    );

    println!("\nChecking out...");
    let order = shop.checkout().await?;
    println!("   Ordered {} items for {:.2}", order.item_count, order.total);

    let stats = shop.client().stats();
    println!(
        "\nQuery cache: {} entries, {} hits, {} fetches",
        stats.entries, stats.hits, stats.fetches
    );

    shop.dispose();
    Ok(())
}
