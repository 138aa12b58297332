//! LRU Manager Module
//!
//! Store decorator that keeps its wrapped tier under a byte-capacity ceiling
//! by evicting least recently used keys.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Result, StoreError};
use crate::lru::RecencyIndex;
use crate::store::{Store, StoreRef};

// == Public Constants ==
/// Smallest capacity `open` accepts, in bytes
pub const MIN_CAPACITY: i64 = 10;

/// Share of the total capacity freed once eviction triggers
pub const DEFAULT_CUSHION_RATIO: f64 = 0.1;

/// Number of per-key I/O locks
const KEY_LOCK_STRIPES: usize = 64;

#[derive(Debug)]
struct LruState {
    /// Bytes left before eviction is required; may go negative
    capacity: i64,
    index: RecencyIndex,
    evictions: u64,
}

/// State shared with the eviction task.
struct Shared {
    store: StoreRef,
    state: Mutex<LruState>,
    /// Serializes wrapped-store I/O per key, so an index change and the
    /// store call that mirrors it are never interleaved with another
    /// call on the same key.
    key_locks: Vec<tokio::sync::Mutex<()>>,
}

impl Shared {
    fn key_lock(&self, key: &str) -> &tokio::sync::Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.key_locks[hasher.finish() as usize % self.key_locks.len()]
    }

    /// Deletes evicted keys from the wrapped store.
    async fn delete_evicted(&self, victims: Vec<String>) {
        let ctx = Context::background();
        for key in victims {
            let _guard = self.key_lock(&key).lock().await;
            // A get or put since the eviction tracks the key again.
            let live = self.state.lock().index.contains(&key);
            if live {
                continue;
            }

            debug!(key = %key, "lru eviction");
            if let Err(err) = self.store.del(&ctx, &key).await {
                warn!(key = %key, error = %err, "failed to delete evicted key");
            }
        }
    }
}

// == LRU Manager ==
/// Capacity-bounded decorator around a single store.
///
/// `sum(tracked sizes) + capacity() == total_capacity()` holds after every
/// call. The index starts empty and is not seeded from the wrapped store.
pub struct LruManager {
    total: i64,
    cushion: i64,
    shared: Arc<Shared>,
}

impl LruManager {
    // == Constructors ==
    /// Wraps `store` with a ceiling of `capacity` bytes and a 10% cushion.
    pub fn new(capacity: i64, store: StoreRef) -> Self {
        let cushion = (capacity as f64 * DEFAULT_CUSHION_RATIO) as i64;
        Self::with_cushion(capacity, cushion, store)
    }

    /// Wraps `store` with an explicit cushion.
    pub fn with_cushion(capacity: i64, cushion: i64, store: StoreRef) -> Self {
        Self {
            total: capacity,
            cushion,
            shared: Arc::new(Shared {
                store,
                state: Mutex::new(LruState {
                    capacity,
                    index: RecencyIndex::new(),
                    evictions: 0,
                }),
                key_locks: (0..KEY_LOCK_STRIPES)
                    .map(|_| tokio::sync::Mutex::new(()))
                    .collect(),
            }),
        }
    }

    // == Introspection ==
    /// Bytes remaining before eviction is required.
    pub fn capacity(&self) -> i64 {
        self.shared.state.lock().capacity
    }

    pub fn total_capacity(&self) -> i64 {
        self.total
    }

    pub fn cushion(&self) -> i64 {
        self.cushion
    }

    pub fn num_items(&self) -> usize {
        self.shared.state.lock().index.len()
    }

    /// Number of keys evicted since construction.
    pub fn evictions(&self) -> u64 {
        self.shared.state.lock().evictions
    }

    /// Sum of the sizes of every tracked key.
    pub fn tracked_bytes(&self) -> i64 {
        self.shared.state.lock().index.total_size()
    }

    /// Tracked keys, least recently used first.
    pub fn tracked_keys(&self) -> Vec<String> {
        self.shared.state.lock().index.keys()
    }

    // == Prune ==
    /// Evicts least recently used keys until `capacity >= cushion`, but only
    /// once the capacity has been exhausted.
    ///
    /// Victims leave the index at once. Their deletes run on a spawned task
    /// that outlives a cancelled caller, so every evicted key is removed
    /// from the wrapped store.
    async fn prune(&self) {
        let victims = {
            let mut state = self.shared.state.lock();
            if state.capacity > 0 {
                return;
            }

            let mut victims = Vec::new();
            while state.capacity < self.cushion {
                match state.index.evict_oldest() {
                    Some((key, size)) => {
                        state.capacity += size;
                        state.evictions += 1;
                        victims.push(key);
                    }
                    None => break,
                }
            }
            victims
        };
        if victims.is_empty() {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let deletes = tokio::spawn(async move { shared.delete_evicted(victims).await });
        if let Err(err) = deletes.await {
            warn!(error = %err, "eviction task failed");
        }
    }
}

impl std::fmt::Debug for LruManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruManager")
            .field("total", &self.total)
            .field("cushion", &self.cushion)
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}

#[async_trait]
impl Store for LruManager {
    async fn open(&self) -> Result<()> {
        if self.total < MIN_CAPACITY {
            return Err(StoreError::InvalidCapacity(self.total));
        }
        self.shared.store.open().await
    }

    async fn close(&self) -> Result<()> {
        self.shared.store.close().await
    }

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
        ctx.check()?;
        let size = val.len() as i64;

        let res = {
            let _guard = self.shared.key_lock(key).lock().await;
            {
                let mut state = self.shared.state.lock();
                match state.index.touch(key, size) {
                    Some(previous) => state.capacity += previous - size,
                    None => state.capacity -= size,
                }
            }
            self.shared.store.put(ctx, key, val).await
        };

        self.prune().await;
        res
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        let _guard = self.shared.key_lock(key).lock().await;
        let val = self.shared.store.get(ctx, key).await?;

        let mut state = self.shared.state.lock();
        if !state.index.promote(key) && !val.is_empty() {
            state.index.touch(key, val.len() as i64);
            state.capacity -= val.len() as i64;
        }
        Ok(val)
    }

    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        ctx.check()?;
        let _guard = self.shared.key_lock(key).lock().await;
        {
            let mut state = self.shared.state.lock();
            if let Some(size) = state.index.remove(key) {
                state.capacity += size;
            }
        }
        self.shared.store.del(ctx, key).await
    }
}
