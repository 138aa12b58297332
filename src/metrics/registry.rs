//! Metrics Registry Module
//!
//! Aggregates elapsed-time samples under namespaced metric names.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

// == Timing Stats ==
/// Aggregated samples for one metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingStats {
    /// Number of measured calls
    pub count: u64,
    /// Calls that returned an error
    pub errors: u64,
    /// Sum of elapsed time in microseconds
    pub total_us: u64,
    /// Slowest call in microseconds
    pub max_us: u64,
}

impl TimingStats {
    // == Mean ==
    /// Average elapsed time in microseconds, or 0.0 without samples.
    pub fn mean_us(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_us as f64 / self.count as f64
        }
    }

    fn record(&mut self, elapsed: Duration, failed: bool) {
        let micros = elapsed.as_micros().min(u64::MAX as u128) as u64;
        self.count += 1;
        self.total_us = self.total_us.saturating_add(micros);
        self.max_us = self.max_us.max(micros);
        if failed {
            self.errors += 1;
        }
    }
}

// == Metrics Snapshot ==
/// Point-in-time copy of every metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub timings: BTreeMap<String, TimingStats>,
}

// == Metrics Registry ==
/// Thread-safe sink for timing samples.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    timings: Mutex<BTreeMap<String, TimingStats>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Measure Since ==
    /// Records the time elapsed since `start` under `name`.
    pub fn measure_since(&self, name: &str, start: Instant, failed: bool) {
        self.record(name, start.elapsed(), failed);
    }

    pub fn record(&self, name: &str, elapsed: Duration, failed: bool) {
        self.timings
            .lock()
            .entry(name.to_string())
            .or_default()
            .record(elapsed, failed);
    }

    pub fn get(&self, name: &str) -> Option<TimingStats> {
        self.timings.lock().get(name).cloned()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            taken_at: Utc::now(),
            timings: self.timings.lock().clone(),
        }
    }

    pub fn reset(&self) {
        self.timings.lock().clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new() {
        let registry = MetricsRegistry::new();
        assert!(registry.snapshot().timings.is_empty());
        assert!(registry.get("x.Get").is_none());
    }

    #[test]
    fn test_record_aggregates() {
        let registry = MetricsRegistry::new();
        registry.record("mem.Get", Duration::from_micros(10), false);
        registry.record("mem.Get", Duration::from_micros(30), true);

        let stats = registry.get("mem.Get").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_us, 40);
        assert_eq!(stats.max_us, 30);
        assert_eq!(stats.mean_us(), 20.0);
    }

    #[test]
    fn test_mean_without_samples() {
        assert_eq!(TimingStats::default().mean_us(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = MetricsRegistry::new();
        registry.record("disk.Put", Duration::from_micros(5), false);

        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["timings"]["disk.Put"]["count"], 1);
        assert!(json["taken_at"].is_string());
    }

    #[test]
    fn test_reset() {
        let registry = MetricsRegistry::new();
        registry.record("a.Del", Duration::from_micros(1), false);
        registry.reset();
        assert!(registry.get("a.Del").is_none());
    }
}
