//! Memory Store Module
//!
//! Unbounded in-process map; pair it with an LRU manager for a ceiling.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::context::Context;
use crate::error::Result;
use crate::lru::LruManager;
use crate::store::Store;

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A memory store capped at `capacity` bytes.
    pub fn bounded(capacity: i64) -> LruManager {
        LruManager::new(capacity, Arc::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Store for MemStore {
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
        ctx.check()?;
        self.data.write().insert(key.to_string(), val.to_vec());
        Ok(())
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        Ok(self.data.read().get(key).cloned().unwrap_or_default())
    }

    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        ctx.check()?;
        self.data.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[tokio::test]
    async fn test_put_get_del() {
        let store = MemStore::new();
        let ctx = Context::background();

        store.put(&ctx, "k", b"v").await.unwrap();
        assert_eq!(store.get(&ctx, "k").await.unwrap(), b"v");
        assert_eq!(store.len(), 1);

        store.del(&ctx, "k").await.unwrap();
        assert!(store.get(&ctx, "k").await.unwrap().is_empty());
        store.del(&ctx, "k").await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let store = MemStore::new();
        let ctx = Context::background();
        ctx.cancel();

        assert!(matches!(
            store.put(&ctx, "k", b"v").await,
            Err(StoreError::Cancelled)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_bounded() {
        let store = MemStore::bounded(10);
        let ctx = Context::background();
        store.open().await.unwrap();

        store.put(&ctx, "a", &[0; 6]).await.unwrap();
        store.put(&ctx, "b", &[0; 6]).await.unwrap();
        assert!(store.get(&ctx, "a").await.unwrap().is_empty());
        assert_eq!(store.num_items(), 1);
    }
}
