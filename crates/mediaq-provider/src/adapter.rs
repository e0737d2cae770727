//! Provider adapter contract.

use std::sync::Arc;

use async_trait::async_trait;

use mediaq_models::{AssetSnapshot, UploadSnapshot};

use crate::error::ProviderResult;

/// Read-only view of the external encoding provider.
///
/// The provider never pushes updates; the reconciler pulls through this
/// trait on every tick.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Current state of a direct upload, and the asset created from it.
    async fn get_upload_state(&self, upload_ref: &str) -> ProviderResult<UploadSnapshot>;

    /// Current state of an asset, and its playback references.
    async fn get_asset_state(&self, asset_ref: &str) -> ProviderResult<AssetSnapshot>;
}

#[async_trait]
impl<T: ProviderAdapter + ?Sized> ProviderAdapter for Arc<T> {
    async fn get_upload_state(&self, upload_ref: &str) -> ProviderResult<UploadSnapshot> {
        (**self).get_upload_state(upload_ref).await
    }

    async fn get_asset_state(&self, asset_ref: &str) -> ProviderResult<AssetSnapshot> {
        (**self).get_asset_state(asset_ref).await
    }
}
