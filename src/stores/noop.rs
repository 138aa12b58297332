//! No-op Store Module

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::store::Store;

// == Noop Store ==
/// Accepts every call and stores nothing; every get is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl NoopStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Store for NoopStore {
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, ctx: &Context, _key: &str, _val: &[u8]) -> Result<()> {
        ctx.check()
    }

    async fn get(&self, ctx: &Context, _key: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        Ok(Vec::new())
    }

    async fn del(&self, ctx: &Context, _key: &str) -> Result<()> {
        ctx.check()
    }
}
