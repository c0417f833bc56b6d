//! ttl_cache - interactive cache shell
//!
//! Reads commands from stdin and answers with one JSON line each.
//! Logs go to stderr so they never interleave with responses.

use anyhow::Context;
use tokio::io::BufReader;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_cache::shell::{self, ShellCache};
use ttl_cache::{CacheEvent, Config};

/// Main entry point for the cache shell.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache engine with the configured policies
/// 4. Serve stdin until EOF, `QUIT` or Ctrl+C
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting ttl_cache shell");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        "Configuration loaded: max_entries={}, default_ttl={}s, eviction={}, gc_enabled={}",
        config.max_entries, config.default_ttl, config.eviction, config.gc_enabled
    );

    let cache: ShellCache = ShellCache::from_config(&config).context("failed to build cache")?;
    cache
        .on_event(|event| {
            if let CacheEvent::Delete { key, reason } = event {
                info!(key = %key, reason = ?reason, "Entry deleted");
            }
        })
        .await;

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = shell::run(&cache, stdin, stdout) => result?,
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, shutting down");
        }
    }

    cache.clear().await;
    info!("Shell shutdown complete");
    Ok(())
}
