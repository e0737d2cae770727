//! Before/after comparison of a reconciliation attempt.

use chrono::Utc;

use mediaq_models::{ExtractionStatus, QueueItem, UploadStatus};
use mediaq_store::{ItemUpdate, Precondition};

use crate::policy::PolicyAction;

// =============================================================================
// Deltas
// =============================================================================

/// Provider identifiers learned during an observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedRefs {
    pub asset_ref: Option<String>,
    pub playback_ref: Option<String>,
}

/// What to write for one item, if anything.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDelta {
    /// Stored state already matches.
    None,
    /// Partial update of progress, refs or retry bookkeeping.
    Update(ItemUpdate),
    /// Status and error message set together.
    Fail { error_message: String },
}

impl ItemDelta {
    pub fn is_none(&self) -> bool {
        matches!(self, ItemDelta::None)
    }

    /// True if this write moves the item into `completed`.
    pub fn completes(&self) -> bool {
        matches!(self, ItemDelta::Update(u) if u.upload_status == Some(UploadStatus::Completed))
    }

    /// True if this write also claims the extraction stage.
    pub fn claims_extraction(&self) -> bool {
        matches!(self, ItemDelta::Update(u) if u.extraction_status == Some(ExtractionStatus::Processing))
    }
}

/// Compute the delta between the stored item and the policy's decision.
///
/// A completion also claims the extraction stage in the same write when it
/// is still pending.
pub fn compute_delta(item: &QueueItem, action: &PolicyAction, refs: &ObservedRefs) -> ItemDelta {
    if item.is_terminal() {
        return ItemDelta::None;
    }

    let mut update = ItemUpdate::new();

    match action {
        PolicyAction::Fail { error_message } => {
            return ItemDelta::Fail {
                error_message: error_message.clone(),
            };
        }
        PolicyAction::Retry {
            retry_count,
            error_message,
        } => {
            if *retry_count != item.retry_count {
                update = update.retry_count(*retry_count);
            }
            if item.error_message.as_deref() != Some(error_message.as_str()) {
                update = update.error_message(error_message.clone());
            }
        }
        PolicyAction::Advance { status, progress } => {
            if *status != item.upload_status {
                update = update.upload_status(*status);
            }
            if *progress != item.upload_progress {
                update = update.upload_progress(*progress);
            }
            if let Some(asset_ref) = &refs.asset_ref {
                if item.asset_ref.as_deref() != Some(asset_ref.as_str()) {
                    update = update.asset_ref(asset_ref.clone());
                }
            }
            if *status == UploadStatus::Completed {
                if let Some(playback_ref) = &refs.playback_ref {
                    if item.playback_ref.as_deref() != Some(playback_ref.as_str()) {
                        update = update.playback_ref(playback_ref.clone());
                    }
                }
                update = update.completed_at(Utc::now());
                if item.extraction_status == ExtractionStatus::Pending {
                    update = update.extraction(ExtractionStatus::Processing, 0);
                }
            }
            if item.error_message.is_some() {
                update = update.clear_error_message();
            }
        }
    }

    if update.is_empty() {
        ItemDelta::None
    } else {
        ItemDelta::Update(update)
    }
}

// =============================================================================
// Write Preconditions
// =============================================================================

/// Precondition for persisting a delta computed from `item`.
///
/// The write only lands if the stored status is still the one the decision
/// was based on. An extraction claim also requires extraction to be pending.
pub fn write_precondition(item: &QueueItem, delta: &ItemDelta) -> Precondition {
    let precondition = Precondition::upload_status(item.upload_status);
    if delta.claims_extraction() {
        precondition.and_extraction_status(ExtractionStatus::Pending)
    } else {
        precondition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> QueueItem {
        QueueItem::new("clip.mp4", Some("up-1".into()), 3).with_id("item-1")
    }

    fn advance(status: UploadStatus, progress: u8) -> PolicyAction {
        PolicyAction::Advance { status, progress }
    }

    #[test]
    fn test_no_change_is_no_delta() {
        let delta = compute_delta(&item(), &advance(UploadStatus::Pending, 0), &ObservedRefs::default());
        assert!(delta.is_none());
    }

    #[test]
    fn test_processing_delta_records_asset() {
        let refs = ObservedRefs {
            asset_ref: Some("A1".into()),
            playback_ref: None,
        };
        let delta = compute_delta(&item(), &advance(UploadStatus::Processing, 75), &refs);

        let ItemDelta::Update(update) = delta else {
            panic!("expected an update, got {:?}", delta);
        };
        assert_eq!(update.upload_status, Some(UploadStatus::Processing));
        assert_eq!(update.upload_progress, Some(75));
        assert_eq!(update.asset_ref.as_deref(), Some("A1"));
        assert!(update.extraction_status.is_none());
        assert!(update.completed_at.is_none());
    }

    #[test]
    fn test_completion_claims_extraction() {
        let mut current = item();
        current.upload_status = UploadStatus::Processing;
        current.upload_progress = 75;
        current.asset_ref = Some("A1".into());
        let refs = ObservedRefs {
            asset_ref: Some("A1".into()),
            playback_ref: Some("P1".into()),
        };

        let delta = compute_delta(&current, &advance(UploadStatus::Completed, 100), &refs);
        assert!(delta.completes());
        assert!(delta.claims_extraction());

        let ItemDelta::Update(update) = &delta else {
            panic!("expected an update");
        };
        assert_eq!(update.playback_ref.as_deref(), Some("P1"));
        assert!(update.asset_ref.is_none());
        assert_eq!(update.extraction_progress, Some(0));
        assert!(update.completed_at.is_some());

        let precondition = write_precondition(&current, &delta);
        assert_eq!(
            precondition,
            Precondition::upload_status(UploadStatus::Processing).and_extraction_status(ExtractionStatus::Pending)
        );
    }

    #[test]
    fn test_success_clears_error_and_keeps_retries() {
        let mut current = item();
        current.retry_count = 2;
        current.error_message = Some("timeout".into());

        let delta = compute_delta(&current, &advance(UploadStatus::Pending, 0), &ObservedRefs::default());
        let ItemDelta::Update(update) = delta else {
            panic!("expected an update");
        };
        assert_eq!(update.error_message, Some(None));
        assert!(update.retry_count.is_none());
    }

    #[test]
    fn test_retry_delta_only_writes_changes() {
        let mut current = item();
        current.retry_count = 1;
        current.error_message = Some("timeout".into());

        let action = PolicyAction::Retry {
            retry_count: 2,
            error_message: "timeout".into(),
        };
        let ItemDelta::Update(update) = compute_delta(&current, &action, &ObservedRefs::default()) else {
            panic!("expected an update");
        };
        assert_eq!(update.retry_count, Some(2));
        assert!(update.error_message.is_none());
    }

    #[test]
    fn test_terminal_items_get_no_delta() {
        let mut current = item();
        current.upload_status = UploadStatus::Cancelled;

        let action = PolicyAction::Fail {
            error_message: "late verdict".into(),
        };
        assert!(compute_delta(&current, &action, &ObservedRefs::default()).is_none());
        assert!(compute_delta(&current, &advance(UploadStatus::Completed, 100), &ObservedRefs::default()).is_none());
    }
}
