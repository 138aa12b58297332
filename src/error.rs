//! Error types for the storage chain
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for every store, chain and decorator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key violates the shape or length rules
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Every tier of a chain was scanned without a hit
    #[error("No such key: {0}")]
    NoSuchKey(String),

    /// A chain or decorator was built from zero stores
    #[error("No stores provided")]
    MissingStores,

    /// The call's deadline passed
    #[error("Timed out")]
    Timeout,

    /// The call's context was cancelled
    #[error("Cancelled")]
    Cancelled,

    /// LRU capacity below the allowed minimum
    #[error("Invalid capacity {0}, must be >= 10 bytes")]
    InvalidCapacity(i64),

    /// The store was used after being closed
    #[error("Store is closed")]
    Closed,

    /// Filesystem failure inside a tier
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Opaque failure reported by a backing tier
    #[error("Tier failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Several independent failures, e.g. from closing every tier
    #[error("{}", join_errors(.0))]
    Multiple(Vec<StoreError>),
}

impl StoreError {
    /// Wraps any tier-specific error as a [`StoreError::Backend`].
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }

    /// True for errors produced by an expired or cancelled context.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Cancelled)
    }

    /// True when the error only means the key was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NoSuchKey(_))
    }

    /// Collapses a list of failures: none, one, or an aggregate.
    pub(crate) fn from_many(mut errors: Vec<StoreError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(StoreError::Multiple(errors)),
        }
    }
}

fn join_errors(errors: &[StoreError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// == Result Type Alias ==
/// Convenience Result type for the storage chain.
pub type Result<T> = std::result::Result<T, StoreError>;
