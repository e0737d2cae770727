//! In-memory queue store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use mediaq_models::{QueueItem, QueueItemId, UploadStatus};

use crate::error::{StoreError, StoreResult};
use crate::metrics::{record_precondition_failure, record_write};
use crate::store::QueueStore;
use crate::update::{ItemUpdate, Precondition};

// =============================================================================
// In-Memory Store
// =============================================================================

/// Queue store kept in process memory.
///
/// Every mutation runs under a single write lock, which makes the
/// precondition check and the write one atomic step.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    items: RwLock<HashMap<QueueItemId, QueueItem>>,
    writes: AtomicU64,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `items`.
    pub fn with_items(items: impl IntoIterator<Item = QueueItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        Self {
            items: RwLock::new(items),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of committed writes since creation.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn committed(&self, operation: &str) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        record_write(operation);
    }

    fn check(operation: &str, precondition: &Precondition, item: &QueueItem) -> StoreResult<()> {
        precondition.check(item).map_err(|reason| {
            record_precondition_failure(operation);
            debug!(item_id = %item.id, operation, "Store precondition failed: {}", reason);
            StoreError::precondition_failed(reason)
        })
    }
}

// =============================================================================
// QueueStore Implementation
// =============================================================================

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn insert(&self, item: QueueItem) -> StoreResult<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(StoreError::AlreadyExists(item.id.to_string()));
        }
        items.insert(item.id.clone(), item);
        self.committed("insert");
        Ok(())
    }

    async fn get(&self, id: &QueueItemId) -> StoreResult<Option<QueueItem>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn list_active(&self) -> StoreResult<Vec<QueueItem>> {
        let items = self.items.read().await;
        let mut active: Vec<QueueItem> = items.values().filter(|i| i.is_active()).cloned().collect();
        // Oldest first so long-waiting items are reconciled early in the tick
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn list(&self, limit: usize, offset: usize) -> StoreResult<Vec<QueueItem>> {
        let items = self.items.read().await;
        let mut all: Vec<&QueueItem> = items.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn update_fields(
        &self,
        id: &QueueItemId,
        precondition: &Precondition,
        update: ItemUpdate,
    ) -> StoreResult<QueueItem> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        Self::check("update_fields", precondition, item)?;

        if update.is_empty() {
            return Ok(item.clone());
        }

        update.apply_to(item, Utc::now());
        self.committed("update_fields");
        Ok(item.clone())
    }

    async fn update_status(
        &self,
        id: &QueueItemId,
        precondition: &Precondition,
        status: UploadStatus,
        error_message: Option<String>,
    ) -> StoreResult<QueueItem> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        Self::check("update_status", precondition, item)?;

        let now = Utc::now();
        item.upload_status = status;
        item.error_message = error_message;
        if status == UploadStatus::Completed && item.completed_at.is_none() {
            item.completed_at = Some(now);
        }
        item.updated_at = now;
        self.committed("update_status");
        Ok(item.clone())
    }

    async fn delete(&self, id: &QueueItemId, precondition: &Precondition) -> StoreResult<QueueItem> {
        let mut items = self.items.write().await;
        let item = items
            .get(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        Self::check("delete", precondition, item)?;

        let removed = items
            .remove(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        self.committed("delete");
        Ok(removed)
    }
}
