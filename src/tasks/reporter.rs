//! Metrics Reporter Task
//!
//! Background task that periodically logs a snapshot of store timings.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::metrics::MetricsRegistry;

/// Spawns a background task that logs a metrics snapshot every
/// `interval_secs` seconds.
///
/// The task runs until aborted through the returned handle.
///
/// # Example
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new());
/// let reporter = spawn_metrics_reporter(registry.clone(), 60);
/// // Later, during shutdown:
/// reporter.abort();
/// ```
pub fn spawn_metrics_reporter(
    registry: Arc<MetricsRegistry>,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting metrics reporter with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let snapshot = registry.snapshot();
            if snapshot.timings.is_empty() {
                debug!("metrics report: no store calls recorded");
                continue;
            }

            for (name, stats) in &snapshot.timings {
                info!(
                    metric = %name,
                    count = stats.count,
                    errors = stats.errors,
                    mean_us = stats.mean_us(),
                    max_us = stats.max_us,
                    "metrics report"
                );
            }
        }
    })
}
