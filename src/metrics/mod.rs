//! Metrics Module
//!
//! Operation timing for stores: a registry that aggregates timings by name
//! and a decorator that feeds it.

mod manager;
mod registry;

pub use manager::MetricsManager;
pub use registry::{MetricsRegistry, MetricsSnapshot, TimingStats};
