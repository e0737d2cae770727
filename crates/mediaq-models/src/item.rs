//! Queue item model.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::status::{ExtractionStatus, UploadStatus};

/// Unique identifier for a queue item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct QueueItemId(pub String);

impl QueueItemId {
    /// Generate a new random item ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for QueueItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for QueueItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One tracked media file: its provider upload plus the downstream
/// extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueueItem {
    /// Primary key, never changes
    pub id: QueueItemId,

    /// Display name of the uploaded file
    pub filename: String,

    /// Provider upload reference. Missing only when intake wrote a broken
    /// record; such items cannot be reconciled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_ref: Option<String>,

    /// Provider asset reference, set once the provider creates the asset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,

    /// Provider playback reference, set once the asset is ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_ref: Option<String>,

    #[serde(default)]
    pub upload_status: UploadStatus,

    /// 0-100
    #[serde(default)]
    pub upload_progress: u8,

    #[serde(default)]
    pub extraction_status: ExtractionStatus,

    /// 0-100
    #[serde(default)]
    pub extraction_progress: u8,

    /// Latest failure or retry cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Transient failures observed so far (never exceeds `max_retries`)
    #[serde(default)]
    pub retry_count: u32,

    pub max_retries: u32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    /// Create a freshly submitted item in `pending` with zero progress.
    pub fn new(
        filename: impl Into<String>,
        upload_ref: Option<String>,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: QueueItemId::new(),
            filename: filename.into(),
            upload_ref,
            asset_ref: None,
            playback_ref: None,
            upload_status: UploadStatus::Pending,
            upload_progress: 0,
            extraction_status: ExtractionStatus::Pending,
            extraction_progress: 0,
            error_message: None,
            retry_count: 0,
            max_retries,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Use a caller-chosen id instead of a random one.
    pub fn with_id(mut self, id: impl Into<QueueItemId>) -> Self {
        self.id = id.into();
        self
    }

    /// Check if the upload is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.upload_status.is_terminal()
    }

    /// Check if the poller should still reconcile this item.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// True once retries are used up; the next transient failure fails the item.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}
