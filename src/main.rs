//! Expiry Cache demo driver
//!
//! Fills a cache from several writer tasks, then fires two overlapping
//! eviction sweeps to show that only one of them does the work.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expiry_cache::{CacheConfig, ExpiringCache, SweepContext};

const WRITERS: u64 = 4;
const ENTRIES_PER_WRITER: u64 = 25_000;
const SWEEP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Populate the cache with expired and live entries concurrently
/// 4. Run two sweeps at once and report who did the work
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expiry_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env().context("Failed to load cache configuration")?;
    info!(
        "Configuration loaded: max_items={:?}, max_evictions_per_sweep={:?}",
        config.max_items, config.max_evictions_per_sweep
    );

    let cache: Arc<ExpiringCache<String, u64>> = Arc::new(ExpiringCache::with_config(config));

    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let now = Utc::now();
                for i in 0..ENTRIES_PER_WRITER {
                    // Every other entry is already past its expiry
                    let expires_at = if i % 2 == 0 {
                        now - Duration::seconds((i % 60) as i64 + 1)
                    } else {
                        now + Duration::minutes(10)
                    };
                    cache.put(format!("writer-{writer}-{i}"), i, expires_at);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.await.context("Writer task failed")?;
    }
    info!(
        entries = cache.len(),
        buckets = cache.bucket_count(),
        "Cache populated"
    );

    let ctx = SweepContext::with_timeout(SWEEP_TIMEOUT);
    let sweeps: Vec<_> = (0..2)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let ctx = ctx.clone();
            tokio::task::spawn_blocking(move || cache.evict_expired_keys(&ctx))
        })
        .collect();

    for (caller, sweep) in sweeps.into_iter().enumerate() {
        let evicted = sweep.await.context("Sweep task failed")?;
        info!(caller, evicted, "Sweep returned");
    }

    let stats = serde_json::to_string_pretty(&cache.stats()).context("Failed to encode stats")?;
    info!("Final stats:\n{}", stats);

    Ok(())
}
