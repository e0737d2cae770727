//! Queue item persistence.
//!
//! This crate provides:
//! - The `QueueStore` contract used by the poller and the admin surface
//! - Partial updates (`ItemUpdate`) guarded by preconditions
//! - An in-memory implementation backing the service binary and tests

pub mod error;
pub mod memory;
pub mod metrics;
pub mod store;
pub mod update;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryQueueStore;
pub use store::QueueStore;
pub use update::{ItemUpdate, Precondition};
