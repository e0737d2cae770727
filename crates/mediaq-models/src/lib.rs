//! Shared data models for the mediaq upload reconciler.
//!
//! This crate provides Serde-serializable types for:
//! - Queue items and their identifiers
//! - Upload and extraction status state machines
//! - Raw provider states and snapshots returned by the encoding provider

pub mod item;
pub mod provider;
pub mod status;

// Re-export common types
pub use item::{QueueItem, QueueItemId};
pub use provider::{AssetSnapshot, ProviderAssetState, ProviderUploadState, UploadSnapshot};
pub use status::{ExtractionStatus, ParseStatusError, UploadStatus};
