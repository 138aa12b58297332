//! Chainstore - Multi-tier blob storage chain
//!
//! Composes fast, size-bounded tiers in front of slower durable ones with
//! read backfill, asynchronous replication, LRU eviction, per-call
//! cancellation and operation timing.

pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod lru;
pub mod metrics;
pub mod store;
pub mod stores;
pub mod tasks;
pub mod timeout;

pub use chain::{Chain, ErrorCallback, Mode};
pub use config::Config;
pub use context::Context;
pub use error::{Result, StoreError};
pub use lru::LruManager;
pub use metrics::{MetricsManager, MetricsRegistry};
pub use store::{is_valid_key, validate_key, Store, StoreRef, MAX_KEY_LENGTH};
pub use tasks::spawn_metrics_reporter;
pub use timeout::TimeoutManager;
