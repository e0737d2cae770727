//! The queue store contract.

use async_trait::async_trait;

use mediaq_models::{QueueItem, QueueItemId, UploadStatus};

use crate::error::StoreResult;
use crate::update::{ItemUpdate, Precondition};

/// Persistence contract for queue items.
///
/// The store is the only shared mutable resource: the poller, the admin
/// surface and the extraction pipeline all write through it. Every mutating
/// call takes a [`Precondition`] and is atomic with respect to it.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert a new item. Fails with `AlreadyExists` on an id clash.
    async fn insert(&self, item: QueueItem) -> StoreResult<()>;

    /// Fetch one item.
    async fn get(&self, id: &QueueItemId) -> StoreResult<Option<QueueItem>>;

    /// Fetch every item whose upload status is not terminal.
    async fn list_active(&self) -> StoreResult<Vec<QueueItem>>;

    /// Page through all items, most recently updated first.
    async fn list(&self, limit: usize, offset: usize) -> StoreResult<Vec<QueueItem>>;

    /// Apply a partial update if the precondition holds.
    ///
    /// Returns the item as stored after the write. An empty update is a
    /// no-op that still checks the precondition.
    async fn update_fields(
        &self,
        id: &QueueItemId,
        precondition: &Precondition,
        update: ItemUpdate,
    ) -> StoreResult<QueueItem>;

    /// Set the upload status and error message together.
    ///
    /// `error_message = None` clears any stored message. Moving into
    /// `completed` also stamps `completed_at`.
    async fn update_status(
        &self,
        id: &QueueItemId,
        precondition: &Precondition,
        status: UploadStatus,
        error_message: Option<String>,
    ) -> StoreResult<QueueItem>;

    /// Remove an item if the precondition holds, returning what was removed.
    async fn delete(&self, id: &QueueItemId, precondition: &Precondition) -> StoreResult<QueueItem>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
