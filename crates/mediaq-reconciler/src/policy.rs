//! Retry and failure policy.
//!
//! Decides what a reconciliation attempt does to an item's status and retry
//! bookkeeping:
//! - A provider verdict fails the item at once, without touching `retry_count`
//! - A transient fault uses one retry, or fails the item once the budget is spent
//! - A clean observation clears any retry message but keeps `retry_count`

use mediaq_models::{QueueItem, UploadStatus};

use crate::mapper::MappedState;

/// Next action for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyAction {
    /// Adopt the mapped state.
    Advance { status: UploadStatus, progress: u8 },
    /// Count a transient fault and try again next tick.
    Retry { retry_count: u32, error_message: String },
    /// Mark the item failed.
    Fail { error_message: String },
}

impl PolicyAction {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PolicyAction::Advance { .. } => "advance",
            PolicyAction::Retry { .. } => "retry",
            PolicyAction::Fail { .. } => "fail",
        }
    }
}

/// Stateless bounded-retry policy. The counters live on the item.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy;

impl RetryPolicy {
    pub fn new() -> Self {
        Self
    }

    /// The provider answered and the answer was mapped.
    pub fn on_observation(&self, mapped: &MappedState) -> PolicyAction {
        match &mapped.verdict {
            Some(cause) => PolicyAction::Fail {
                error_message: cause.clone(),
            },
            None => PolicyAction::Advance {
                status: mapped.status,
                progress: mapped.progress,
            },
        }
    }

    /// The attempt faulted before the provider gave a usable answer.
    pub fn on_fault(&self, item: &QueueItem, cause: &str) -> PolicyAction {
        if item.retry_count < item.max_retries {
            PolicyAction::Retry {
                retry_count: item.retry_count + 1,
                error_message: cause.to_string(),
            }
        } else {
            PolicyAction::Fail {
                error_message: format!("failed after {} retries: {}", item.retry_count, cause),
            }
        }
    }
}
