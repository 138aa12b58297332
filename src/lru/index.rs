//! Recency Index Module
//!
//! Tracks access order and byte size of every key an LRU manager knows about.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy)]
struct Slot {
    size: i64,
    tick: u64,
}

// == Recency Index ==
/// Keys ordered by last access, each with its tracked size.
///
/// Every touch stamps the key with a fresh, strictly increasing tick, so
/// the order is total:
/// - Highest tick = Most recently used
/// - Lowest tick = Least recently used
#[derive(Debug, Default)]
pub struct RecencyIndex {
    slots: HashMap<String, Slot>,
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl RecencyIndex {
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    // == Touch ==
    /// Records `key` with `size` as most recently used.
    ///
    /// Returns the previously tracked size when the key was already present.
    pub fn touch(&mut self, key: &str, size: i64) -> Option<i64> {
        let tick = self.stamp();
        match self.slots.get_mut(key) {
            Some(slot) => {
                let previous = slot.size;
                self.order.remove(&slot.tick);
                slot.size = size;
                slot.tick = tick;
                self.order.insert(tick, key.to_string());
                Some(previous)
            }
            None => {
                self.slots.insert(key.to_string(), Slot { size, tick });
                self.order.insert(tick, key.to_string());
                None
            }
        }
    }

    // == Promote ==
    /// Marks a tracked key as most recently used without changing its size.
    ///
    /// Returns false if the key is not tracked.
    pub fn promote(&mut self, key: &str) -> bool {
        let tick = self.stamp();
        match self.slots.get_mut(key) {
            Some(slot) => {
                self.order.remove(&slot.tick);
                slot.tick = tick;
                self.order.insert(tick, key.to_string());
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Stops tracking a key, returning its size.
    pub fn remove(&mut self, key: &str) -> Option<i64> {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.tick);
        Some(slot.size)
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key and its size.
    pub fn evict_oldest(&mut self) -> Option<(String, i64)> {
        let (_, key) = self.order.pop_first()?;
        let slot = self.slots.remove(&key)?;
        Some((key, slot.size))
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    /// Tracked keys, least recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.order.values().cloned().collect()
    }

    pub fn size_of(&self, key: &str) -> Option<i64> {
        self.slots.get(key).map(|slot| slot.size)
    }

    /// Sum of every tracked size.
    pub fn total_size(&self) -> i64 {
        self.slots.values().map(|slot| slot.size).sum()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }
}
