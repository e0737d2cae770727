//! Partial updates and write preconditions.

use chrono::{DateTime, Utc};

use mediaq_models::{ExtractionStatus, QueueItem, UploadStatus};

// =============================================================================
// Partial Updates
// =============================================================================

/// A set of field changes applied atomically to one queue item.
///
/// Unset fields are left untouched. `updated_at` is always bumped by the
/// store when a non-empty update is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub upload_status: Option<UploadStatus>,
    pub upload_progress: Option<u8>,
    pub asset_ref: Option<String>,
    pub playback_ref: Option<String>,
    pub extraction_status: Option<ExtractionStatus>,
    pub extraction_progress: Option<u8>,
    /// `Some(None)` clears the message
    pub error_message: Option<Option<String>>,
    pub retry_count: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ItemUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_status(mut self, status: UploadStatus) -> Self {
        self.upload_status = Some(status);
        self
    }

    pub fn upload_progress(mut self, progress: u8) -> Self {
        self.upload_progress = Some(progress.min(100));
        self
    }

    pub fn asset_ref(mut self, asset_ref: impl Into<String>) -> Self {
        self.asset_ref = Some(asset_ref.into());
        self
    }

    pub fn playback_ref(mut self, playback_ref: impl Into<String>) -> Self {
        self.playback_ref = Some(playback_ref.into());
        self
    }

    pub fn extraction(mut self, status: ExtractionStatus, progress: u8) -> Self {
        self.extraction_status = Some(status);
        self.extraction_progress = Some(progress.min(100));
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(Some(message.into()));
        self
    }

    pub fn clear_error_message(mut self) -> Self {
        self.error_message = Some(None);
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// True if applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the fields this update touches, for logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.upload_status.is_some() {
            names.push("upload_status");
        }
        if self.upload_progress.is_some() {
            names.push("upload_progress");
        }
        if self.asset_ref.is_some() {
            names.push("asset_ref");
        }
        if self.playback_ref.is_some() {
            names.push("playback_ref");
        }
        if self.extraction_status.is_some() {
            names.push("extraction_status");
        }
        if self.extraction_progress.is_some() {
            names.push("extraction_progress");
        }
        if self.error_message.is_some() {
            names.push("error_message");
        }
        if self.retry_count.is_some() {
            names.push("retry_count");
        }
        if self.completed_at.is_some() {
            names.push("completed_at");
        }
        names
    }

    /// Apply the update to an in-memory copy of the item.
    pub fn apply_to(&self, item: &mut QueueItem, now: DateTime<Utc>) {
        if self.is_empty() {
            return;
        }
        if let Some(status) = self.upload_status {
            item.upload_status = status;
        }
        if let Some(progress) = self.upload_progress {
            item.upload_progress = progress;
        }
        if let Some(asset_ref) = &self.asset_ref {
            item.asset_ref = Some(asset_ref.clone());
        }
        if let Some(playback_ref) = &self.playback_ref {
            item.playback_ref = Some(playback_ref.clone());
        }
        if let Some(status) = self.extraction_status {
            item.extraction_status = status;
        }
        if let Some(progress) = self.extraction_progress {
            item.extraction_progress = progress;
        }
        if let Some(message) = &self.error_message {
            item.error_message = message.clone();
        }
        if let Some(retry_count) = self.retry_count {
            item.retry_count = retry_count;
        }
        if let Some(at) = self.completed_at {
            item.completed_at = Some(at);
        }
        item.updated_at = now;
    }
}

// =============================================================================
// Preconditions
// =============================================================================

/// Conditions the stored item must satisfy for a write to go through.
///
/// Writers pass the state they based their decision on; a concurrent change
/// (an admin cancel racing the poller, two triggers racing for the same
/// extraction) makes the write fail with `PreconditionFailed` instead of
/// silently overwriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    upload_status: Option<Vec<UploadStatus>>,
    extraction_status: Option<ExtractionStatus>,
    extraction_progress_max: Option<u8>,
}

impl Precondition {
    /// Unconditional write.
    pub fn none() -> Self {
        Self::default()
    }

    /// Require the stored upload status to equal `status`.
    pub fn upload_status(status: UploadStatus) -> Self {
        Self {
            upload_status: Some(vec![status]),
            ..Self::default()
        }
    }

    /// Require the stored upload status to be one of `statuses`.
    pub fn upload_status_in(statuses: &[UploadStatus]) -> Self {
        Self {
            upload_status: Some(statuses.to_vec()),
            ..Self::default()
        }
    }

    /// Additionally require the stored extraction status to equal `status`.
    pub fn and_extraction_status(mut self, status: ExtractionStatus) -> Self {
        self.extraction_status = Some(status);
        self
    }

    /// Additionally require the stored extraction progress to be at most
    /// `progress`, so a write never moves progress backwards.
    pub fn and_extraction_progress_at_most(mut self, progress: u8) -> Self {
        self.extraction_progress_max = Some(progress);
        self
    }

    /// Check the stored item, describing the first mismatch.
    pub fn check(&self, item: &QueueItem) -> Result<(), String> {
        if let Some(expected) = &self.upload_status {
            if !expected.contains(&item.upload_status) {
                let expected: Vec<&str> = expected.iter().map(UploadStatus::as_str).collect();
                return Err(format!(
                    "item {} has upload status {}, expected one of [{}]",
                    item.id,
                    item.upload_status,
                    expected.join(", ")
                ));
            }
        }
        if let Some(expected) = self.extraction_status {
            if item.extraction_status != expected {
                return Err(format!(
                    "item {} has extraction status {}, expected {}",
                    item.id, item.extraction_status, expected
                ));
            }
        }
        if let Some(max) = self.extraction_progress_max {
            if item.extraction_progress > max {
                return Err(format!(
                    "item {} has extraction progress {}, expected at most {}",
                    item.id, item.extraction_progress, max
                ));
            }
        }
        Ok(())
    }
}
