//! Log Manager Module
//!
//! Pass-through tier that records every call it sees. Placed in front of a
//! chain it logs requests; it never stores anything itself.

use async_trait::async_trait;
use tracing::info;

use crate::context::Context;
use crate::error::Result;
use crate::store::Store;

// == Log Manager ==
#[derive(Debug, Clone, Default)]
pub struct LogManager {
    tag: String,
}

impl LogManager {
    /// `tag` is included in every record; empty means untagged.
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    fn cancelled(ctx: &Context) -> &'static str {
        if ctx.is_done() {
            " (cancelled)"
        } else {
            ""
        }
    }
}

#[async_trait]
impl Store for LogManager {
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
        info!(
            tag = %self.tag,
            "chainstore: Put {} of {} bytes{}",
            key,
            val.len(),
            Self::cancelled(ctx)
        );
        ctx.check()
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        info!(tag = %self.tag, "chainstore: Get {}{}", key, Self::cancelled(ctx));
        ctx.check()?;
        Ok(Vec::new())
    }

    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        info!(tag = %self.tag, "chainstore: Del {}{}", key, Self::cancelled(ctx));
        ctx.check()
    }
}
