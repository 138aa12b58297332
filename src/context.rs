//! Call Context Module
//!
//! Per-call cancellation handle carried by every data operation.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoreError};

// == Context ==
/// Cancellation token plus an optional deadline.
///
/// Derived contexts share cancellation with their parent (cancelling the
/// parent cancels the child, never the reverse) and can only tighten the
/// deadline.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    // == Constructors ==
    /// A fresh context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A child context that can be cancelled independently.
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// A child context expiring after `timeout`, or earlier if the parent
    /// deadline comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A child context expiring at `deadline`, or at the parent's deadline
    /// if that is earlier.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    // == Cancel ==
    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    // == Err ==
    /// The reason this context is done, if it is.
    pub fn err(&self) -> Option<StoreError> {
        if self.token.is_cancelled() {
            return Some(StoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StoreError::Timeout),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    // == Check ==
    /// Fails fast when the context is already done.
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // == Done ==
    /// Resolves with the cancellation error once the context is done.
    pub async fn done(&self) -> StoreError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => StoreError::Cancelled,
                _ = sleep_until(deadline) => StoreError::Timeout,
            },
            None => {
                self.token.cancelled().await;
                StoreError::Cancelled
            }
        }
    }

    // == Run ==
    /// Drives `fut` until it completes or the context is done, whichever
    /// happens first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            res = fut => res,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_is_never_done() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
        assert_eq!(ctx.run(async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_children_only() {
        let parent = Context::background();
        let child = parent.with_cancel();

        child.cancel();
        assert!(matches!(child.check(), Err(StoreError::Cancelled)));
        assert!(parent.check().is_ok());

        let child = parent.with_cancel();
        parent.cancel();
        assert!(matches!(child.check(), Err(StoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_earliest_deadline_wins() {
        let ctx = Context::background();
        let short = ctx.with_timeout(Duration::from_millis(10));
        let longer = short.with_timeout(Duration::from_secs(60));
        assert_eq!(short.deadline(), longer.deadline());

        let long = ctx.with_timeout(Duration::from_secs(60));
        let tighter = long.with_timeout(Duration::from_millis(10));
        assert!(tighter.deadline().unwrap() < long.deadline().unwrap());
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let res: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(StoreError::Timeout)));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_run_short_circuits_when_cancelled() {
        let ctx = Context::background();
        ctx.cancel();
        let res = ctx.run(async { Ok(1) }).await;
        assert!(matches!(res, Err(StoreError::Cancelled)));
    }
}
