//! Raw states reported by the external encoding provider.
//!
//! The provider's vocabulary is open-ended: anything outside the known set is
//! kept verbatim in an `Unrecognized` variant so it can be logged and treated
//! as "no information yet" instead of being rejected at the wire layer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Provider States
// =============================================================================

/// State of a direct upload at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderUploadState {
    /// Waiting for the file bytes
    Waiting,
    /// The provider created an asset from the upload
    AssetCreated,
    /// The provider rejected the upload
    Errored,
    /// The upload was cancelled at the provider
    Cancelled,
    /// A state this service does not know
    Unrecognized(String),
}

impl ProviderUploadState {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderUploadState::Waiting => "waiting",
            ProviderUploadState::AssetCreated => "asset_created",
            ProviderUploadState::Errored => "errored",
            ProviderUploadState::Cancelled => "cancelled",
            ProviderUploadState::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for ProviderUploadState {
    fn from(raw: &str) -> Self {
        match raw {
            "waiting" => ProviderUploadState::Waiting,
            "asset_created" => ProviderUploadState::AssetCreated,
            "errored" => ProviderUploadState::Errored,
            "cancelled" => ProviderUploadState::Cancelled,
            other => ProviderUploadState::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for ProviderUploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of an asset at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderAssetState {
    /// Encoding in progress
    Preparing,
    /// Playable
    Ready,
    /// Encoding failed
    Errored,
    /// A state this service does not know
    Unrecognized(String),
}

impl ProviderAssetState {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderAssetState::Preparing => "preparing",
            ProviderAssetState::Ready => "ready",
            ProviderAssetState::Errored => "errored",
            ProviderAssetState::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for ProviderAssetState {
    fn from(raw: &str) -> Self {
        match raw {
            "preparing" => ProviderAssetState::Preparing,
            "ready" => ProviderAssetState::Ready,
            "errored" => ProviderAssetState::Errored,
            other => ProviderAssetState::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for ProviderAssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(<$ty>::from(raw.as_str()))
            }
        }
    };
}

string_serde!(ProviderUploadState);
string_serde!(ProviderAssetState);

// =============================================================================
// Snapshots
// =============================================================================

/// What the provider reports for an upload reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSnapshot {
    pub state: ProviderUploadState,
    /// Asset created from this upload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,
    /// Provider-supplied failure detail for errored uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadSnapshot {
    pub fn new(state: ProviderUploadState) -> Self {
        Self {
            state,
            asset_ref: None,
            error: None,
        }
    }

    pub fn with_asset_ref(mut self, asset_ref: impl Into<String>) -> Self {
        self.asset_ref = Some(asset_ref.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// What the provider reports for an asset reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub state: ProviderAssetState,
    #[serde(default)]
    pub playback_refs: Vec<String>,
}

impl AssetSnapshot {
    pub fn new(state: ProviderAssetState) -> Self {
        Self {
            state,
            playback_refs: Vec::new(),
        }
    }

    pub fn with_playback_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.playback_refs = refs.into_iter().map(Into::into).collect();
        self
    }

    /// The playback reference stored on the queue item (the first one).
    pub fn primary_playback_ref(&self) -> Option<&str> {
        self.playback_refs.first().map(String::as_str)
    }
}
