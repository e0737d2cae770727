//! Upload and extraction status state machines.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

// =============================================================================
// Upload Status
// =============================================================================

/// Upload status of a queue item as tracked against the encoding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Registered, the provider has not received the file yet
    #[default]
    Pending,
    /// The client is pushing bytes to the provider
    Uploading,
    /// The provider is encoding the asset
    Processing,
    /// The asset is ready for playback
    Completed,
    /// The provider rejected the upload, or retries were exhausted
    Failed,
    /// Cancelled by an operator
    Cancelled,
}

impl UploadStatus {
    /// Statuses the poller still reconciles.
    pub const ACTIVE: [UploadStatus; 3] = [
        UploadStatus::Pending,
        UploadStatus::Uploading,
        UploadStatus::Processing,
    ];

    /// Statuses from which no automatic transition happens.
    pub const TERMINAL: [UploadStatus; 3] = [
        UploadStatus::Completed,
        UploadStatus::Failed,
        UploadStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
            UploadStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Failed | UploadStatus::Cancelled
        )
    }

    /// Position along the pending → uploading → processing → completed path.
    ///
    /// `None` for the off-path terminal states.
    pub fn progression_rank(&self) -> Option<u8> {
        match self {
            UploadStatus::Pending => Some(0),
            UploadStatus::Uploading => Some(1),
            UploadStatus::Processing => Some(2),
            UploadStatus::Completed => Some(3),
            UploadStatus::Failed | UploadStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(UploadStatus::Pending),
            "uploading" => Ok(UploadStatus::Uploading),
            "processing" => Ok(UploadStatus::Processing),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            "cancelled" | "canceled" => Ok(UploadStatus::Cancelled),
            other => Err(ParseStatusError {
                kind: "upload",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Extraction Status
// =============================================================================

/// Status of the downstream content-extraction stage.
///
/// Only leaves `Pending` once the upload has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::Processing => "processing",
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExtractionStatus::Completed | ExtractionStatus::Failed)
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExtractionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ExtractionStatus::Pending),
            "processing" => Ok(ExtractionStatus::Processing),
            "completed" => Ok(ExtractionStatus::Completed),
            "failed" => Ok(ExtractionStatus::Failed),
            other => Err(ParseStatusError {
                kind: "extraction",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        for status in UploadStatus::TERMINAL {
            assert!(status.is_terminal());
        }
        for status in UploadStatus::ACTIVE {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn test_progression_rank_orders_happy_path() {
        assert!(UploadStatus::Pending.progression_rank() < UploadStatus::Uploading.progression_rank());
        assert!(UploadStatus::Uploading.progression_rank() < UploadStatus::Processing.progression_rank());
        assert!(UploadStatus::Processing.progression_rank() < UploadStatus::Completed.progression_rank());
        assert_eq!(UploadStatus::Failed.progression_rank(), None);
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        let json = serde_json::to_string(&UploadStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let parsed: ExtractionStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(parsed, ExtractionStatus::Processing);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Canceled".parse::<UploadStatus>().unwrap(), UploadStatus::Cancelled);
        assert!("bogus".parse::<UploadStatus>().is_err());
        assert_eq!("failed".parse::<ExtractionStatus>().unwrap(), ExtractionStatus::Failed);
    }
}
