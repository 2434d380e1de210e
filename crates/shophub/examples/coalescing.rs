use shophub::prelude::*;
use shophub::{JsonSerializer, TracingMetrics};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Hits, misses and fetch latency show up as trace events
    let client = QueryClient::with_serializer_and_metrics(
        JsonSerializer,
        TracingMetrics::new().with_service_name("coalescing-demo"),
        QueryClientConfig::default(),
    );

    // Count how many times the source is actually hit
    let fetch_count = Arc::new(AtomicUsize::new(0));
    let key = ProductKeys::detail(42);

    println!("Spawning 10 concurrent queries for {key}...");

    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        let key = key.clone();
        let fetch_count = fetch_count.clone();

        handles.push(tokio::spawn(async move {
            let result = client
                .query(
                    key,
                    move || {
                        let fetch_count = fetch_count.clone();
                        async move {
                            sleep(Duration::from_millis(100)).await;
                            let count = fetch_count.fetch_add(1, Ordering::SeqCst) + 1;
                            println!("Fetching... (count: {count})");
                            Ok("Wireless Headphones".to_string())
                        }
                    },
                    QueryOpts::new(),
                )
                .await?;
            assert_eq!(result.get(), "Wireless Headphones");
            Ok::<_, ShopError>(())
        }));
    }

    for handle in handles {
        handle.await??;
    }

    let fetches = fetch_count.load(Ordering::SeqCst);
    let stats = client.stats();
    println!("Fetches performed: {fetches}");
    println!("Requests coalesced: {}", stats.coalesced);

    if fetches != 1 {
        panic!("Deduplication failed! Expected 1 fetch, got {fetches}");
    }
    println!("SUCCESS: concurrent queries shared one fetch.");

    Ok(())
}
