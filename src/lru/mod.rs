//! LRU Module
//!
//! Byte-capacity eviction for a single store.

mod index;
mod manager;

#[cfg(test)]
mod property_tests;

pub use index::RecencyIndex;
pub use manager::{LruManager, DEFAULT_CUSHION_RATIO, MIN_CAPACITY};
