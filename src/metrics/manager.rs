//! Metrics Manager Module
//!
//! Store decorator timing every operation under `<namespace>.<Operation>`.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::trace;

use crate::chain::Chain;
use crate::context::Context;
use crate::error::{Result, StoreError};
use crate::metrics::MetricsRegistry;
use crate::store::{Store, StoreRef};

// == Metrics Manager ==
/// Forwards every call unchanged and records its wall-clock duration.
pub struct MetricsManager {
    namespace: String,
    registry: Arc<MetricsRegistry>,
    inner: StoreRef,
}

impl MetricsManager {
    // == Constructor ==
    /// Wraps `stores`; more than one store is composed into a synchronous
    /// chain first.
    pub fn new(
        namespace: impl Into<String>,
        registry: Arc<MetricsRegistry>,
        mut stores: Vec<StoreRef>,
    ) -> Result<Self> {
        let inner: StoreRef = match stores.len() {
            0 => return Err(StoreError::MissingStores),
            1 => stores.remove(0),
            _ => Arc::new(Chain::new(stores)?),
        };
        Ok(Self {
            namespace: namespace.into(),
            registry,
            inner,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    // == Measure ==
    async fn measure<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let name = format!("{}.{}", self.namespace, operation);
        let start = Instant::now();
        let res = fut.await;
        self.registry.measure_since(&name, start, res.is_err());
        trace!(
            metric = %name,
            elapsed_us = start.elapsed().as_micros() as u64,
            "store call measured"
        );
        res
    }
}

impl std::fmt::Debug for MetricsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsManager")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[async_trait]
impl Store for MetricsManager {
    async fn open(&self) -> Result<()> {
        self.measure("Open", self.inner.open()).await
    }

    async fn close(&self) -> Result<()> {
        self.measure("Close", self.inner.close()).await
    }

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
        ctx.check()?;
        self.measure("Put", self.inner.put(ctx, key, val)).await
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        self.measure("Get", self.inner.get(ctx, key)).await
    }

    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        ctx.check()?;
        self.measure("Del", self.inner.del(ctx, key)).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{MemStore, NoopStore};

    fn metered(stores: Vec<StoreRef>) -> (Arc<MetricsRegistry>, MetricsManager) {
        let registry = Arc::new(MetricsRegistry::new());
        let manager = MetricsManager::new("test.mem", registry.clone(), stores).unwrap();
        (registry, manager)
    }

    #[test]
    fn test_requires_a_store() {
        let registry = Arc::new(MetricsRegistry::new());
        assert!(matches!(
            MetricsManager::new("x", registry, vec![]),
            Err(StoreError::MissingStores)
        ));
    }

    #[tokio::test]
    async fn test_records_each_operation() {
        let (registry, manager) = metered(vec![Arc::new(MemStore::new()) as StoreRef]);
        let ctx = Context::background();

        manager.open().await.unwrap();
        manager.put(&ctx, "k", b"v").await.unwrap();
        assert_eq!(manager.get(&ctx, "k").await.unwrap(), b"v");
        manager.get(&ctx, "k").await.unwrap();
        manager.del(&ctx, "k").await.unwrap();
        manager.close().await.unwrap();

        for op in ["Open", "Put", "Del", "Close"] {
            let stats = registry.get(&format!("test.mem.{op}")).unwrap();
            assert_eq!(stats.count, 1, "{op}");
        }
        assert_eq!(registry.get("test.mem.Get").unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_passes_errors_through() {
        let (registry, manager) = metered(vec![
            Arc::new(NoopStore::new()) as StoreRef,
            Arc::new(MemStore::new()) as StoreRef,
        ]);
        let ctx = Context::background();

        // the nested chain reports exhaustion and the manager keeps it intact
        assert!(matches!(
            manager.get(&ctx, "absent").await,
            Err(StoreError::NoSuchKey(_))
        ));
        assert!(matches!(
            manager.put(&ctx, "bad key", b"v").await,
            Err(StoreError::InvalidKey(_))
        ));
        assert_eq!(registry.get("test.mem.Get").unwrap().errors, 1);
    }

    #[tokio::test]
    async fn test_cancelled_context_is_not_measured() {
        let (registry, manager) = metered(vec![Arc::new(MemStore::new()) as StoreRef]);
        let ctx = Context::background();
        ctx.cancel();

        assert!(matches!(
            manager.get(&ctx, "k").await,
            Err(StoreError::Cancelled)
        ));
        assert!(registry.get("test.mem.Get").is_none());
    }
}
