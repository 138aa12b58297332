//! Timeout Module
//!
//! Store decorator bounding each data operation with a deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::chain::Chain;
use crate::context::Context;
use crate::error::{Result, StoreError};
use crate::store::{Store, StoreRef};

// == Timeout Manager ==
/// Derives a context expiring after a fixed duration for every put, get and
/// del. A tighter deadline already on the caller's context still wins.
pub struct TimeoutManager {
    timeout: Duration,
    inner: StoreRef,
}

impl TimeoutManager {
    /// Wraps `stores`; more than one store is composed into a synchronous
    /// chain first.
    pub fn new(timeout: Duration, mut stores: Vec<StoreRef>) -> Result<Self> {
        let inner: StoreRef = match stores.len() {
            0 => return Err(StoreError::MissingStores),
            1 => stores.remove(0),
            _ => Arc::new(Chain::new(stores)?),
        };
        Ok(Self { timeout, inner })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for TimeoutManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutManager")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Store for TimeoutManager {
    async fn open(&self) -> Result<()> {
        self.inner.open().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
        let ctx = ctx.with_timeout(self.timeout);
        ctx.run(self.inner.put(&ctx, key, val)).await
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        let ctx = ctx.with_timeout(self.timeout);
        ctx.run(self.inner.get(&ctx, key)).await
    }

    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        let ctx = ctx.with_timeout(self.timeout);
        ctx.run(self.inner.del(&ctx, key)).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemStore;

    /// Tier that takes a fixed time to answer unless its context ends first.
    struct SlowStore {
        delay: Duration,
    }

    #[async_trait]
    impl Store for SlowStore {
        async fn open(&self) -> Result<()> {
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
        async fn put(&self, ctx: &Context, _key: &str, _val: &[u8]) -> Result<()> {
            ctx.run(async {
                tokio::time::sleep(self.delay).await;
                Ok(())
            })
            .await
        }
        async fn get(&self, ctx: &Context, _key: &str) -> Result<Vec<u8>> {
            ctx.run(async {
                tokio::time::sleep(self.delay).await;
                Ok(b"slow".to_vec())
            })
            .await
        }
        async fn del(&self, ctx: &Context, _key: &str) -> Result<()> {
            ctx.check()
        }
    }

    fn slow(delay_ms: u64) -> StoreRef {
        Arc::new(SlowStore {
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn test_fast_calls_pass() {
        let store = TimeoutManager::new(
            Duration::from_secs(1),
            vec![Arc::new(MemStore::new()) as StoreRef],
        )
        .unwrap();
        let ctx = Context::background();

        store.put(&ctx, "k", b"v").await.unwrap();
        assert_eq!(store.get(&ctx, "k").await.unwrap(), b"v");
        store.del(&ctx, "k").await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_calls_time_out() {
        let store = TimeoutManager::new(Duration::from_millis(20), vec![slow(500)]).unwrap();
        let ctx = Context::background();

        assert!(matches!(
            store.get(&ctx, "k").await,
            Err(StoreError::Timeout)
        ));
        assert!(matches!(
            store.put(&ctx, "k", b"v").await,
            Err(StoreError::Timeout)
        ));
        // the caller's own context is untouched
        assert!(ctx.check().is_ok());
    }

    #[tokio::test]
    async fn test_caller_deadline_wins_when_tighter() {
        let store = TimeoutManager::new(Duration::from_secs(10), vec![slow(500)]).unwrap();
        let ctx = Context::background().with_timeout(Duration::from_millis(20));

        let started = tokio::time::Instant::now();
        assert!(matches!(
            store.get(&ctx, "k").await,
            Err(StoreError::Timeout)
        ));
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_cancelled_caller_fails_fast() {
        let store = TimeoutManager::new(Duration::from_secs(1), vec![slow(10)]).unwrap();
        let ctx = Context::background();
        ctx.cancel();

        assert!(matches!(
            store.get(&ctx, "k").await,
            Err(StoreError::Cancelled)
        ));
    }

    #[test]
    fn test_requires_a_store() {
        assert!(matches!(
            TimeoutManager::new(Duration::from_secs(1), vec![]),
            Err(StoreError::MissingStores)
        ));
    }
}
