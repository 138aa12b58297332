//! Configuration Module
//!
//! Loads storage pipeline settings from environment variables and assembles
//! the standard chain.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::Chain;
use crate::error::{Result, StoreError};
use crate::lru::LruManager;
use crate::metrics::{MetricsManager, MetricsRegistry};
use crate::store::StoreRef;
use crate::stores::{FileStore, MemStore};
use crate::timeout::TimeoutManager;

/// Storage pipeline configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Byte ceiling of the in-memory tier
    pub memory_capacity: i64,
    /// Root directory of the on-disk tier
    pub disk_path: PathBuf,
    /// Byte ceiling of the on-disk tier
    pub disk_capacity: i64,
    /// Empty the disk root when the pipeline opens
    pub reset_disk: bool,
    /// Per-call deadline in milliseconds
    pub timeout_ms: u64,
    /// Prefix for every metric name
    pub metrics_namespace: String,
    /// Seconds between metrics reports
    pub report_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CHAINSTORE_MEMORY_CAPACITY` - Memory tier bytes (default: 64 MiB)
    /// - `CHAINSTORE_DISK_PATH` - Disk tier root (default: ./data/chainstore)
    /// - `CHAINSTORE_DISK_CAPACITY` - Disk tier bytes (default: 1 GiB)
    /// - `CHAINSTORE_RESET_DISK` - Clear the disk root on open (default: true)
    /// - `CHAINSTORE_TIMEOUT_MS` - Per-call deadline (default: 5000)
    /// - `CHAINSTORE_METRICS_NAMESPACE` - Metric prefix (default: chainstore)
    /// - `CHAINSTORE_REPORT_INTERVAL` - Metrics report seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_capacity: parse_env("CHAINSTORE_MEMORY_CAPACITY")
                .unwrap_or(defaults.memory_capacity),
            disk_path: env::var("CHAINSTORE_DISK_PATH")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.disk_path),
            disk_capacity: parse_env("CHAINSTORE_DISK_CAPACITY").unwrap_or(defaults.disk_capacity),
            reset_disk: parse_env("CHAINSTORE_RESET_DISK").unwrap_or(defaults.reset_disk),
            timeout_ms: parse_env("CHAINSTORE_TIMEOUT_MS").unwrap_or(defaults.timeout_ms),
            metrics_namespace: env::var("CHAINSTORE_METRICS_NAMESPACE")
                .unwrap_or(defaults.metrics_namespace),
            report_interval: parse_env("CHAINSTORE_REPORT_INTERVAL")
                .unwrap_or(defaults.report_interval),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    // == Build Store ==
    /// Assembles `Timeout(Chain[metrics(lru(memory)), Async(metrics(lru(disk)))])`.
    ///
    /// The returned store is not opened yet. With `reset_disk` set, opening
    /// it empties `disk_path` first: the disk LRU index starts empty, so
    /// files left by an earlier run would sit outside its byte ceiling.
    pub fn build_store<F>(&self, registry: Arc<MetricsRegistry>, on_error: F) -> Result<StoreRef>
    where
        F: Fn(StoreError) + Send + Sync + 'static,
    {
        let memory: StoreRef = Arc::new(MetricsManager::new(
            format!("{}.mem", self.metrics_namespace),
            registry.clone(),
            vec![Arc::new(MemStore::bounded(self.memory_capacity)) as StoreRef],
        )?);

        let mut files = FileStore::new(&self.disk_path);
        if self.reset_disk {
            files = files.with_reset();
        }
        let disk: StoreRef = Arc::new(MetricsManager::new(
            format!("{}.disk", self.metrics_namespace),
            registry,
            vec![Arc::new(LruManager::new(self.disk_capacity, Arc::new(files))) as StoreRef],
        )?);

        let replicated: StoreRef = Arc::new(Chain::asynchronous(vec![disk])?.on_error(on_error));
        let chain: StoreRef = Arc::new(Chain::new(vec![memory, replicated])?);

        Ok(Arc::new(TimeoutManager::new(self.timeout(), vec![chain])?))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_capacity: 64 * 1024 * 1024,
            disk_path: PathBuf::from("./data/chainstore"),
            disk_capacity: 1024 * 1024 * 1024,
            reset_disk: true,
            timeout_ms: 5000,
            metrics_namespace: "chainstore".to_string(),
            report_interval: 60,
        }
    }
}
