//! Provider REST wire types.

use serde::Deserialize;

use mediaq_models::{AssetSnapshot, ProviderAssetState, ProviderUploadState, UploadSnapshot};

/// Every provider response wraps its payload in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// `GET /video/v1/uploads/{id}` payload.
#[derive(Debug, Deserialize)]
pub struct UploadResource {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub error: Option<ResourceError>,
}

/// Failure detail attached to errored resources.
#[derive(Debug, Deserialize)]
pub struct ResourceError {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ResourceError {
    fn describe(&self) -> Option<String> {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => Some(format!("{}: {}", kind, message)),
            (None, Some(message)) => Some(message.clone()),
            (Some(kind), None) => Some(kind.clone()),
            (None, None) => None,
        }
    }
}

/// `GET /video/v1/assets/{id}` payload.
#[derive(Debug, Deserialize)]
pub struct AssetResource {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackId {
    pub id: String,
    #[serde(default)]
    pub policy: Option<String>,
}

impl From<UploadResource> for UploadSnapshot {
    fn from(resource: UploadResource) -> Self {
        UploadSnapshot {
            state: ProviderUploadState::from(resource.status.as_str()),
            asset_ref: resource.asset_id.filter(|id| !id.is_empty()),
            error: resource.error.as_ref().and_then(ResourceError::describe),
        }
    }
}

impl From<AssetResource> for AssetSnapshot {
    fn from(resource: AssetResource) -> Self {
        AssetSnapshot {
            state: ProviderAssetState::from(resource.status.as_str()),
            playback_refs: resource.playback_ids.into_iter().map(|p| p.id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_resource_conversion() {
        let body = r#"{"data":{"id":"up-1","status":"errored","error":{"type":"invalid_input","message":"bad codec"}}}"#;
        let envelope: Envelope<UploadResource> = serde_json::from_str(body).unwrap();
        let snapshot = UploadSnapshot::from(envelope.data);

        assert_eq!(snapshot.state, ProviderUploadState::Errored);
        assert_eq!(snapshot.asset_ref, None);
        assert_eq!(snapshot.error.as_deref(), Some("invalid_input: bad codec"));
    }

    #[test]
    fn test_asset_resource_conversion() {
        let body = r#"{"data":{"id":"A1","status":"ready","playback_ids":[{"id":"P1","policy":"public"},{"id":"P2"}]}}"#;
        let envelope: Envelope<AssetResource> = serde_json::from_str(body).unwrap();
        let snapshot = AssetSnapshot::from(envelope.data);

        assert_eq!(snapshot.state, ProviderAssetState::Ready);
        assert_eq!(snapshot.playback_refs, vec!["P1", "P2"]);
    }

    #[test]
    fn test_empty_asset_id_is_ignored() {
        let body = r#"{"data":{"id":"up-1","status":"waiting","asset_id":""}}"#;
        let envelope: Envelope<UploadResource> = serde_json::from_str(body).unwrap();
        assert_eq!(UploadSnapshot::from(envelope.data).asset_ref, None);
    }
}
