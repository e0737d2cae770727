//! Structured per-item logging.

use tracing::{error, info, warn, Span};

use mediaq_models::{QueueItemId, UploadStatus};

/// Logger carrying the item id and operation on every line.
#[derive(Debug, Clone)]
pub struct ItemLogger {
    item_id: String,
    operation: String,
}

impl ItemLogger {
    pub fn new(item_id: &QueueItemId, operation: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            item_id = %self.item_id,
            operation = %self.operation,
            "Item started: {}", message
        );
    }

    /// Log a persisted upload status change.
    pub fn log_transition(&self, from: UploadStatus, to: UploadStatus, progress: u8) {
        info!(
            item_id = %self.item_id,
            operation = %self.operation,
            from = %from,
            to = %to,
            progress,
            "Item transition: {} -> {}", from, to
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            item_id = %self.item_id,
            operation = %self.operation,
            "Item warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            item_id = %self.item_id,
            operation = %self.operation,
            "Item error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            item_id = %self.item_id,
            operation = %self.operation,
            "Item completed: {}", message
        );
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span for instrumenting one item's work.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "item",
            item_id = %self.item_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_logger_creation() {
        let id = QueueItemId::from_string("item-1");
        let logger = ItemLogger::new(&id, "reconcile");

        assert_eq!(logger.item_id(), "item-1");
        assert_eq!(logger.operation(), "reconcile");
    }
}
