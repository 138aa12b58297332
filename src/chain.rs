//! Chain Module
//!
//! Composes an ordered list of stores into a single store: writes fan out to
//! every tier, reads fall through tiers until a hit and backfill the tiers
//! that missed. An async chain detaches its writes onto background tasks and
//! reports failures only through its error callback.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::error::{Result, StoreError};
use crate::store::{validate_key, Store, StoreRef};

/// Callback receiving failures of detached work.
pub type ErrorCallback = Arc<dyn Fn(StoreError) + Send + Sync>;

// == Mode ==
/// Whether a chain runs its writes in-line or on background tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sync,
    Async,
}

// == Chain ==
/// Ordered composition of tiers, itself a [`Store`].
pub struct Chain {
    tiers: Arc<[StoreRef]>,
    mode: Mode,
    reporter: ErrorReporter,
}

impl Chain {
    // == Constructors ==
    /// Builds a synchronous chain. Tier order is scan order for reads.
    pub fn new(tiers: Vec<StoreRef>) -> Result<Self> {
        Self::with_mode(tiers, Mode::Sync)
    }

    /// Builds an async chain whose writes never block the caller.
    pub fn asynchronous(tiers: Vec<StoreRef>) -> Result<Self> {
        Self::with_mode(tiers, Mode::Async)
    }

    fn with_mode(tiers: Vec<StoreRef>, mode: Mode) -> Result<Self> {
        if tiers.is_empty() {
            return Err(StoreError::MissingStores);
        }
        Ok(Self {
            tiers: tiers.into(),
            mode,
            reporter: ErrorReporter::default(),
        })
    }

    /// Registers the callback that receives failures of background work
    /// (async writes and read backfills).
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(StoreError) + Send + Sync + 'static,
    {
        self.reporter = ErrorReporter {
            callback: Some(Arc::new(callback)),
        };
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    // == Backfill ==
    /// Writes a value found in tier `hit` into every earlier tier, nearest
    /// first, on a detached task.
    fn spawn_backfill(&self, hit: usize, key: &str, val: &[u8]) {
        if hit == 0 {
            return;
        }
        let tiers = Arc::clone(&self.tiers);
        let reporter = self.reporter.clone();
        let key = key.to_string();
        let val = val.to_vec();

        tokio::spawn(async move {
            let ctx = Context::background();
            for tier in tiers[..hit].iter().rev() {
                if let Err(err) = tier.put(&ctx, &key, &val).await {
                    reporter.report(err);
                }
            }
            debug!(key = %key, tiers = hit, "backfill complete");
        });
    }

    // == Detach ==
    /// Runs a write on a background task under a fresh context; failures go
    /// to the reporter.
    fn detach<F, Fut>(&self, op: F)
    where
        F: FnOnce(Arc<[StoreRef]>, Context) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let tiers = Arc::clone(&self.tiers);
        let reporter = self.reporter.clone();
        tokio::spawn(async move {
            if let Err(err) = op(tiers, Context::background()).await {
                reporter.report(err);
            }
        });
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("tiers", &self.tiers.len())
            .field("mode", &self.mode)
            .field("on_error", &self.reporter.callback.is_some())
            .finish()
    }
}

#[async_trait]
impl Store for Chain {
    async fn open(&self) -> Result<()> {
        for tier in self.tiers.iter() {
            tier.open().await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut errors = Vec::new();
        for tier in self.tiers.iter() {
            if let Err(err) = tier.close().await {
                errors.push(err);
            }
        }
        match StoreError::from_many(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn put(&self, ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
        validate_key(key)?;
        ctx.check()?;

        match self.mode {
            Mode::Sync => put_all(&self.tiers, ctx, key, val).await,
            Mode::Async => {
                let key = key.to_string();
                let val = val.to_vec();
                self.detach(move |tiers, ctx| async move {
                    put_all(&tiers, &ctx, &key, &val).await
                });
                Ok(())
            }
        }
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        ctx.check()?;

        let found = match self.mode {
            Mode::Sync => scan(&self.tiers, ctx, key).await?,
            Mode::Async => {
                let tiers = Arc::clone(&self.tiers);
                let owned_key = key.to_string();
                let handle = tokio::spawn(async move {
                    scan(&tiers, &Context::background(), &owned_key).await
                });

                // The caller's context bounds only the wait; the scan runs on.
                let joined = ctx
                    .run(async {
                        Ok(handle
                            .await
                            .unwrap_or_else(|join_err| Err(StoreError::backend(join_err))))
                    })
                    .await?;
                match joined {
                    Ok(found) => found,
                    Err(err) => {
                        self.reporter.report(err);
                        return Ok(Vec::new());
                    }
                }
            }
        };

        match found {
            Some((hit, val)) => {
                debug!(key = %key, tier = hit, "chain hit");
                self.spawn_backfill(hit, key, &val);
                Ok(val)
            }
            None => Err(StoreError::NoSuchKey(key.to_string())),
        }
    }

    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        validate_key(key)?;
        ctx.check()?;

        match self.mode {
            Mode::Sync => del_all(&self.tiers, ctx, key).await,
            Mode::Async => {
                let key = key.to_string();
                self.detach(move |tiers, ctx| async move { del_all(&tiers, &ctx, &key).await });
                Ok(())
            }
        }
    }
}

// == Tier Operations ==
/// Puts into every tier in order, stopping at the first failure.
async fn put_all(tiers: &[StoreRef], ctx: &Context, key: &str, val: &[u8]) -> Result<()> {
    for tier in tiers {
        ctx.check()?;
        tier.put(ctx, key, val).await?;
    }
    Ok(())
}

/// Deletes from every tier; reports the first hard failure once all tiers
/// were tried. Cancellation stops immediately.
async fn del_all(tiers: &[StoreRef], ctx: &Context, key: &str) -> Result<()> {
    let mut first_err = None;
    for tier in tiers {
        ctx.check()?;
        match tier.del(ctx, key).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) if err.is_cancellation() => return Err(err),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Scans tiers front to back for the first non-empty value.
///
/// A nested chain's `NoSuchKey` counts as a miss; every other error ends
/// the scan.
async fn scan(tiers: &[StoreRef], ctx: &Context, key: &str) -> Result<Option<(usize, Vec<u8>)>> {
    for (i, tier) in tiers.iter().enumerate() {
        ctx.check()?;
        match tier.get(ctx, key).await {
            Ok(val) if !val.is_empty() => return Ok(Some((i, val))),
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

// == Error Reporter ==
/// Delivers background failures to the registered callback.
#[derive(Clone, Default)]
struct ErrorReporter {
    callback: Option<ErrorCallback>,
}

impl ErrorReporter {
    fn report(&self, err: StoreError) {
        match &self.callback {
            Some(callback) => {
                let callback = Arc::clone(callback);
                if catch_unwind(AssertUnwindSafe(move || callback(err))).is_err() {
                    error!("chain error callback panicked");
                }
            }
            None => warn!(error = %err, "background chain operation failed"),
        }
    }
}
