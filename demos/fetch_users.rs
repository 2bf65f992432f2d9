//! Fetch a user twice through a `Query`, showing the cache hit on the second
//! request.
//!
//! Run with: `RUST_LOG=fetch_cache=debug cargo run --example fetch_users`
//! (set `FETCH_BASE_URL` to point at another API).

use fetch_cache::telemetry::TracingEventSink;
use fetch_cache::{FetchClientBuilder, Status};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = FetchClientBuilder::new()
        .base_url("https://jsonplaceholder.typicode.com")
        .cache_ttl(Duration::from_secs(60))
        .event_sink(Arc::new(TracingEventSink))
        .from_env()
        .build()?;

    let query = client.query();
    for attempt in 1..=2 {
        query.request("/users/1").await;
        let state = query.wait_settled().await?;
        match state.status() {
            Status::Success => println!(
                "attempt {}: {} (from cache: {})",
                attempt,
                state.data().map(|v| v.to_string()).unwrap_or_default(),
                state.is_from_cache()
            ),
            Status::Error => {
                if let Some(err) = state.error() {
                    eprintln!("attempt {}: failed: {}", attempt, err);
                }
            }
            other => println!("attempt {}: {:?}", attempt, other),
        }
    }

    let stats = client.cache_stats();
    println!("cache hits={} misses={}", stats.hits, stats.misses);
    Ok(())
}
