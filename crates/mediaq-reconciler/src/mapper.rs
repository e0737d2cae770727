//! Provider state to internal status mapping.
//!
//! Pure functions only. Given what the provider reports and what is stored,
//! decide the `(UploadStatus, progress)` the item should have:
//!
//! | upload          | asset      | status     | progress  |
//! |-----------------|------------|------------|-----------|
//! | waiting         |            | pending    | 0         |
//! | asset_created   | preparing  | processing | knob (75) |
//! | asset_created   | ready      | completed  | 100       |
//! | asset_created   | errored    | failed     | unchanged |
//! | errored         |            | failed     | unchanged |
//! | cancelled       |            | failed     | unchanged |
//! | unrecognized    |            | unchanged  | unchanged |
//!
//! Mapped values never move an item backwards: a lower status or progress
//! than the stored one keeps the stored one.

use mediaq_models::{AssetSnapshot, ProviderAssetState, ProviderUploadState, UploadSnapshot, UploadStatus};

// =============================================================================
// Mapping
// =============================================================================

/// Outcome of mapping one provider observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedState {
    pub status: UploadStatus,
    pub progress: u8,
    /// Set when the provider declared the upload failed. Carries the cause.
    pub verdict: Option<String>,
}

impl MappedState {
    fn at(status: UploadStatus, progress: u8) -> Self {
        Self {
            status,
            progress,
            verdict: None,
        }
    }
}

/// Raw target before the no-regression clamp.
enum Target {
    Progress(UploadStatus, u8),
    Failed(String),
    NoOp,
}

/// Map a provider observation onto the stored state.
pub fn map_state(
    upload: &UploadSnapshot,
    asset: Option<&AssetSnapshot>,
    current_status: UploadStatus,
    current_progress: u8,
    preparing_progress: u8,
) -> MappedState {
    // Terminal items are immutable
    if current_status.is_terminal() {
        return MappedState::at(current_status, current_progress);
    }

    match raw_target(upload, asset, preparing_progress) {
        Target::NoOp => MappedState::at(current_status, current_progress),
        Target::Failed(cause) => MappedState {
            status: UploadStatus::Failed,
            progress: current_progress,
            verdict: Some(cause),
        },
        Target::Progress(status, progress) => {
            let status = match (status.progression_rank(), current_status.progression_rank()) {
                (Some(mapped), Some(stored)) if mapped < stored => current_status,
                _ => status,
            };
            MappedState::at(status, progress.max(current_progress).min(100))
        }
    }
}

fn raw_target(upload: &UploadSnapshot, asset: Option<&AssetSnapshot>, preparing_progress: u8) -> Target {
    match &upload.state {
        ProviderUploadState::Waiting => Target::Progress(UploadStatus::Pending, 0),
        ProviderUploadState::AssetCreated => match asset.map(|a| &a.state) {
            Some(ProviderAssetState::Preparing) => Target::Progress(UploadStatus::Processing, preparing_progress),
            Some(ProviderAssetState::Ready) => Target::Progress(UploadStatus::Completed, 100),
            Some(ProviderAssetState::Errored) => {
                Target::Failed(describe("asset errored", upload.error.as_deref()))
            }
            Some(ProviderAssetState::Unrecognized(_)) | None => Target::NoOp,
        },
        ProviderUploadState::Errored => Target::Failed(describe("upload errored", upload.error.as_deref())),
        ProviderUploadState::Cancelled => Target::Failed(describe("upload cancelled", upload.error.as_deref())),
        ProviderUploadState::Unrecognized(_) => Target::NoOp,
    }
}

fn describe(what: &str, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("provider reported {}: {}", what, detail),
        None => format!("provider reported {}", what),
    }
}
