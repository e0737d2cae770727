//! Queue administration: intake, list, cancel, delete and extraction write-back.

use std::sync::Arc;

use tracing::{debug, info};

use mediaq_models::{ExtractionStatus, QueueItem, QueueItemId, UploadStatus};
use mediaq_store::{ItemUpdate, Precondition, QueueStore, StoreError};
use mediaq_reconciler::ExtractionTrigger;

use crate::error::{ApiError, ApiResult};

/// Default page size for queue listings.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: usize = 200;

/// Attempts at an extraction write-back that keeps losing to concurrent
/// progress updates.
const EXTRACTION_WRITE_ATTEMPTS: usize = 3;

// =============================================================================
// Queue Admin
// =============================================================================

/// Thin command/query layer over the queue store.
#[derive(Clone)]
pub struct QueueAdmin {
    store: Arc<dyn QueueStore>,
    trigger: ExtractionTrigger,
    default_max_retries: u32,
}

impl QueueAdmin {
    pub fn new(store: Arc<dyn QueueStore>, trigger: ExtractionTrigger, default_max_retries: u32) -> Self {
        Self {
            store,
            trigger,
            default_max_retries,
        }
    }

    /// Page through the queue, most recently updated first.
    pub async fn list(&self, limit: Option<usize>, offset: Option<usize>) -> ApiResult<Vec<QueueItem>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Ok(self.store.list(limit, offset.unwrap_or(0)).await?)
    }

    pub async fn get(&self, id: &QueueItemId) -> ApiResult<QueueItem> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("queue item {}", id)))
    }

    /// Register a submitted file in `pending` with zero progress.
    pub async fn register(
        &self,
        filename: String,
        upload_ref: String,
        max_retries: Option<u32>,
    ) -> ApiResult<QueueItem> {
        let item = QueueItem::new(filename, Some(upload_ref), max_retries.unwrap_or(self.default_max_retries));
        self.store.insert(item.clone()).await?;

        info!(item_id = %item.id, filename = %item.filename, "Queue item registered");
        Ok(item)
    }

    /// Cancel an item that has not reached a terminal status.
    pub async fn cancel(&self, id: &QueueItemId) -> ApiResult<QueueItem> {
        let precondition = Precondition::upload_status_in(&UploadStatus::ACTIVE);
        let item = self
            .store
            .update_status(id, &precondition, UploadStatus::Cancelled, None)
            .await
            .map_err(|e| self.transition_error(id, "cancel", e))?;

        info!(item_id = %id, "Queue item cancelled");
        Ok(item)
    }

    /// Delete an item in a terminal status.
    pub async fn delete(&self, id: &QueueItemId) -> ApiResult<QueueItem> {
        let precondition = Precondition::upload_status_in(&UploadStatus::TERMINAL);
        let item = self
            .store
            .delete(id, &precondition)
            .await
            .map_err(|e| self.transition_error(id, "delete", e))?;

        info!(item_id = %id, "Queue item deleted");
        Ok(item)
    }

    /// Record extraction progress reported by the pipeline.
    ///
    /// Only a claimed (`processing`) stage of a completed upload can be
    /// advanced. Progress never moves backwards and `completed` implies 100.
    pub async fn update_extraction(
        &self,
        id: &QueueItemId,
        status: ExtractionStatus,
        progress: Option<u8>,
    ) -> ApiResult<QueueItem> {
        if status == ExtractionStatus::Pending {
            return Err(ApiError::bad_request("extraction cannot be moved back to pending"));
        }

        let mut attempt = 1;
        let item = loop {
            let current = self.get(id).await?;
            let (progress, precondition) = extraction_write(&current, status, progress);

            match self
                .store
                .update_fields(id, &precondition, ItemUpdate::new().extraction(status, progress))
                .await
            {
                Ok(item) => break item,
                // Progress moved under us; recompute the floor from the new value
                Err(StoreError::PreconditionFailed(reason)) if attempt < EXTRACTION_WRITE_ATTEMPTS => {
                    if !is_claimed(&self.get(id).await?) {
                        let e = StoreError::PreconditionFailed(reason);
                        return Err(self.transition_error(id, "update extraction of", e));
                    }
                    debug!(item_id = %id, attempt, "Extraction progress changed concurrently, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(self.transition_error(id, "update extraction of", e)),
            }
        };

        if status.is_terminal() {
            info!(item_id = %id, extraction_status = %status, "Extraction finished");
        }
        Ok(item)
    }

    /// Fire the extraction stage for a completed item whose stage is still pending.
    pub async fn start_extraction(&self, id: &QueueItemId) -> ApiResult<bool> {
        // Surface unknown ids as 404 rather than a quiet no-op
        self.get(id).await?;
        Ok(self.trigger.start(id).await?)
    }

    fn transition_error(&self, id: &QueueItemId, action: &str, error: StoreError) -> ApiError {
        match error {
            StoreError::PreconditionFailed(reason) => {
                ApiError::conflict(format!("cannot {} item {}: {}", action, id, reason))
            }
            StoreError::NotFound(_) => ApiError::not_found(format!("queue item {}", id)),
            other => other.into(),
        }
    }
}

// =============================================================================
// Extraction Write-Back
// =============================================================================

/// True once the upload completed and the extraction stage has been claimed.
fn is_claimed(item: &QueueItem) -> bool {
    item.upload_status == UploadStatus::Completed && item.extraction_status == ExtractionStatus::Processing
}

/// Progress to write and the guard for it.
///
/// Non-final writes are floored at the stored progress and guarded so the
/// stored value cannot have risen past it in the meantime.
fn extraction_write(current: &QueueItem, status: ExtractionStatus, progress: Option<u8>) -> (u8, Precondition) {
    let precondition =
        Precondition::upload_status(UploadStatus::Completed).and_extraction_status(ExtractionStatus::Processing);

    match status {
        ExtractionStatus::Completed => (100, precondition),
        _ => {
            let progress = progress
                .unwrap_or(current.extraction_progress)
                .min(100)
                .max(current.extraction_progress);
            (progress, precondition.and_extraction_progress_at_most(progress))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mediaq_reconciler::LoggingExtractionPipeline;
    use mediaq_store::{MemoryQueueStore, StoreResult};

    fn admin_with(items: Vec<QueueItem>) -> QueueAdmin {
        let store: Arc<dyn QueueStore> = Arc::new(MemoryQueueStore::with_items(items));
        let trigger = ExtractionTrigger::new(Arc::clone(&store), Arc::new(LoggingExtractionPipeline));
        QueueAdmin::new(store, trigger, 3)
    }

    fn item(id: &str, status: UploadStatus) -> QueueItem {
        let mut item = QueueItem::new("clip.mp4", Some("up-1".into()), 3).with_id(id);
        item.upload_status = status;
        item
    }

    #[tokio::test]
    async fn test_register_uses_default_retries() {
        let admin = admin_with(vec![]);
        let item = admin.register("clip.mp4".into(), "up-1".into(), None).await.unwrap();

        assert_eq!(item.upload_status, UploadStatus::Pending);
        assert_eq!(item.max_retries, 3);
        assert_eq!(admin.get(&item.id).await.unwrap(), item);
    }

    #[tokio::test]
    async fn test_cancel_only_from_active() {
        let admin = admin_with(vec![item("a", UploadStatus::Processing), item("b", UploadStatus::Completed)]);

        let cancelled = admin.cancel(&QueueItemId::from_string("a")).await.unwrap();
        assert_eq!(cancelled.upload_status, UploadStatus::Cancelled);

        let err = admin.cancel(&QueueItemId::from_string("b")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err = admin.cancel(&QueueItemId::from_string("missing")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_only_from_terminal() {
        let admin = admin_with(vec![item("a", UploadStatus::Uploading), item("b", UploadStatus::Failed)]);

        let err = admin.delete(&QueueItemId::from_string("a")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        admin.delete(&QueueItemId::from_string("b")).await.unwrap();
        let err = admin.get(&QueueItemId::from_string("b")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_extraction_write_back_requires_claim() {
        let admin = admin_with(vec![item("a", UploadStatus::Completed)]);
        let id = QueueItemId::from_string("a");

        // Stage still pending: the pipeline has not been started
        let err = admin
            .update_extraction(&id, ExtractionStatus::Processing, Some(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        assert!(admin.start_extraction(&id).await.unwrap());
        assert!(!admin.start_extraction(&id).await.unwrap());

        let updated = admin
            .update_extraction(&id, ExtractionStatus::Processing, Some(40))
            .await
            .unwrap();
        assert_eq!(updated.extraction_progress, 40);

        // Progress never moves backwards
        let updated = admin
            .update_extraction(&id, ExtractionStatus::Processing, Some(20))
            .await
            .unwrap();
        assert_eq!(updated.extraction_progress, 40);

        let done = admin
            .update_extraction(&id, ExtractionStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(done.extraction_status, ExtractionStatus::Completed);
        assert_eq!(done.extraction_progress, 100);

        let err = admin
            .update_extraction(&id, ExtractionStatus::Pending, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    /// Store that lets a competing pipeline report land just before the
    /// first extraction write.
    struct CompetingWriteStore {
        inner: MemoryQueueStore,
        competing_progress: Mutex<Option<u8>>,
    }

    #[async_trait]
    impl QueueStore for CompetingWriteStore {
        async fn insert(&self, item: QueueItem) -> StoreResult<()> {
            self.inner.insert(item).await
        }

        async fn get(&self, id: &QueueItemId) -> StoreResult<Option<QueueItem>> {
            self.inner.get(id).await
        }

        async fn list_active(&self) -> StoreResult<Vec<QueueItem>> {
            self.inner.list_active().await
        }

        async fn list(&self, limit: usize, offset: usize) -> StoreResult<Vec<QueueItem>> {
            self.inner.list(limit, offset).await
        }

        async fn update_fields(
            &self,
            id: &QueueItemId,
            precondition: &Precondition,
            update: ItemUpdate,
        ) -> StoreResult<QueueItem> {
            let competing = self.competing_progress.lock().unwrap().take();
            if let Some(progress) = competing {
                let racing = ItemUpdate::new().extraction(ExtractionStatus::Processing, progress);
                self.inner.update_fields(id, &Precondition::none(), racing).await?;
            }
            self.inner.update_fields(id, precondition, update).await
        }

        async fn update_status(
            &self,
            id: &QueueItemId,
            precondition: &Precondition,
            status: UploadStatus,
            error_message: Option<String>,
        ) -> StoreResult<QueueItem> {
            self.inner.update_status(id, precondition, status, error_message).await
        }

        async fn delete(&self, id: &QueueItemId, precondition: &Precondition) -> StoreResult<QueueItem> {
            self.inner.delete(id, precondition).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_write_back_never_lowers_progress() {
        let mut claimed = item("a", UploadStatus::Completed);
        claimed.extraction_status = ExtractionStatus::Processing;
        claimed.extraction_progress = 30;
        let store: Arc<dyn QueueStore> = Arc::new(CompetingWriteStore {
            inner: MemoryQueueStore::with_items(vec![claimed]),
            competing_progress: Mutex::new(Some(80)),
        });
        let trigger = ExtractionTrigger::new(Arc::clone(&store), Arc::new(LoggingExtractionPipeline));
        let admin = QueueAdmin::new(Arc::clone(&store), trigger, 3);
        let id = QueueItemId::from_string("a");

        // Read 30, asked for 50, but 80 landed before the write
        let updated = admin
            .update_extraction(&id, ExtractionStatus::Processing, Some(50))
            .await
            .unwrap();

        assert_eq!(updated.extraction_progress, 80);
        assert_eq!(store.get(&id).await.unwrap().unwrap().extraction_progress, 80);
    }

    #[tokio::test]
    async fn test_list_clamps_page_size() {
        let items = (0..5).map(|n| item(&format!("i{}", n), UploadStatus::Pending)).collect();
        let admin = admin_with(items);

        assert_eq!(admin.list(Some(0), None).await.unwrap().len(), 1);
        assert_eq!(admin.list(None, Some(3)).await.unwrap().len(), 2);
        assert_eq!(admin.list(Some(10_000), None).await.unwrap().len(), 5);
    }
}
