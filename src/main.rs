//! Chainstore - Multi-tier blob storage chain
//!
//! Interactive driver for the configured storage pipeline. Reads commands
//! from stdin, one per line:
//! - `put <key> <value>`
//! - `get <key>`
//! - `del <key>`
//! - `stats`

use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chainstore::{spawn_metrics_reporter, Config, Context, MetricsRegistry, Store, StoreError};

/// Main entry point for the chainstore driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build and open the storage pipeline
/// 4. Start background metrics reporter
/// 5. Serve stdin commands until EOF or Ctrl+C
/// 6. Close the pipeline
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainstore=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting chainstore");

    let config = Config::from_env();
    info!(
        "Configuration loaded: memory_capacity={}, disk_path={}, disk_capacity={}, timeout={}ms",
        config.memory_capacity,
        config.disk_path.display(),
        config.disk_capacity,
        config.timeout_ms
    );

    let registry = Arc::new(MetricsRegistry::new());
    let store = config
        .build_store(registry.clone(), |err| warn!(error = %err, "async replication failed"))
        .context("failed to build storage chain")?;
    store.open().await.context("failed to open storage chain")?;
    info!("Storage chain opened");

    let reporter = spawn_metrics_reporter(registry.clone(), config.report_interval);

    tokio::select! {
        res = serve(store.as_ref(), &registry) => res?,
        _ = signal::ctrl_c() => info!("Received Ctrl+C, initiating shutdown..."),
    }

    reporter.abort();
    store.close().await.context("failed to close storage chain")?;
    info!("Shutdown complete");
    Ok(())
}

/// Runs stdin commands against `store` until EOF.
async fn serve(store: &dyn Store, registry: &MetricsRegistry) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let reply = execute(store, registry, line.trim()).await;
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn execute(store: &dyn Store, registry: &MetricsRegistry, line: &str) -> String {
    let ctx = Context::background();
    let mut parts = line.splitn(3, ' ');

    let outcome = match (parts.next(), parts.next(), parts.next()) {
        (Some("put"), Some(key), Some(value)) => store
            .put(&ctx, key, value.as_bytes())
            .await
            .map(|()| "OK".to_string()),
        (Some("get"), Some(key), None) => store
            .get(&ctx, key)
            .await
            .map(|val| String::from_utf8_lossy(&val).into_owned()),
        (Some("del"), Some(key), None) => store.del(&ctx, key).await.map(|()| "OK".to_string()),
        (Some("stats"), None, None) => {
            return serde_json::to_string(&registry.snapshot())
                .unwrap_or_else(|err| format!("ERR {err}"))
        }
        (Some(""), None, None) | (None, _, _) => return String::new(),
        _ => return "ERR usage: put <key> <value> | get <key> | del <key> | stats".to_string(),
    };

    match outcome {
        Ok(reply) => reply,
        Err(StoreError::NoSuchKey(_)) => "(nil)".to_string(),
        Err(err) => format!("ERR {err}"),
    }
}
