//! Store Module
//!
//! The contract every tier, chain and decorator implements.

mod key;

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;

pub use key::{is_valid_key, validate_key, MAX_KEY_LENGTH};

// == Store ==
/// Byte-blob storage addressed by string keys.
///
/// Implementations must honor these rules:
/// - `put` and `del` of a missing key succeed.
/// - `get` of a missing key returns an empty value and no error.
/// - Data operations check `ctx` before doing work and return promptly
///   once it is done.
/// - `open` is idempotent; lifecycle calls ignore cancellation.
#[async_trait]
pub trait Store: Send + Sync {
    async fn open(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()>;

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>>;

    async fn del(&self, ctx: &Context, key: &str) -> Result<()>;
}

/// Shared handle to any store.
pub type StoreRef = Arc<dyn Store>;
