//! Leaf Stores Module
//!
//! Concrete tiers that satisfy the [`Store`](crate::store::Store) contract.

mod file;
mod log;
mod memory;
mod noop;

pub use file::FileStore;
pub use log::LogManager;
pub use memory::MemStore;
pub use noop::NoopStore;
