//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the store.
//!
//! # Tasks
//! - Metrics Reporter: Logs store timing snapshots at configured intervals

mod reporter;

pub use reporter::spawn_metrics_reporter;
