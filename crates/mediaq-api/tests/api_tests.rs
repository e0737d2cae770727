//! HTTP API tests.
//!
//! Drive the router in-process against the in-memory store and a canned provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mediaq_api::{create_router, ApiConfig, AppState};
use mediaq_models::{
    AssetSnapshot, ProviderAssetState, ProviderUploadState, QueueItem, QueueItemId, UploadSnapshot, UploadStatus,
};
use mediaq_provider::{ProviderAdapter, ProviderError, ProviderResult};
use mediaq_reconciler::{LoggingExtractionPipeline, ReconcilerConfig};
use mediaq_store::{MemoryQueueStore, QueueStore};

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Default)]
struct CannedProvider {
    uploads: HashMap<String, UploadSnapshot>,
    assets: HashMap<String, AssetSnapshot>,
}

#[async_trait]
impl ProviderAdapter for CannedProvider {
    async fn get_upload_state(&self, upload_ref: &str) -> ProviderResult<UploadSnapshot> {
        self.uploads
            .get(upload_ref)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(upload_ref.to_string()))
    }

    async fn get_asset_state(&self, asset_ref: &str) -> ProviderResult<AssetSnapshot> {
        self.assets
            .get(asset_ref)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(asset_ref.to_string()))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryQueueStore>,
}

impl TestApp {
    fn new(items: Vec<QueueItem>, provider: CannedProvider) -> Self {
        Self::with_reconciler(items, provider, ReconcilerConfig::default())
    }

    fn with_reconciler(items: Vec<QueueItem>, provider: CannedProvider, reconciler: ReconcilerConfig) -> Self {
        let store = Arc::new(MemoryQueueStore::with_items(items));
        let dyn_store: Arc<dyn QueueStore> = store.clone();
        let state = AppState::new(
            ApiConfig::default(),
            dyn_store,
            Arc::new(provider),
            Arc::new(LoggingExtractionPipeline),
            reconciler,
        );
        Self {
            router: create_router(state, None),
            store,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, body) = self.send_raw(method, uri, body).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes.to_vec())
    }

    async fn stored(&self, id: &str) -> Option<QueueItem> {
        self.store.get(&QueueItemId::from_string(id)).await.unwrap()
    }
}

fn item(id: &str, upload_ref: &str, status: UploadStatus) -> QueueItem {
    let mut item = QueueItem::new(format!("{}.mp4", id), Some(upload_ref.to_string()), 3).with_id(id);
    item.upload_status = status;
    item
}

fn ready_provider() -> CannedProvider {
    let mut provider = CannedProvider::default();
    provider.uploads.insert(
        "up-1".into(),
        UploadSnapshot::new(ProviderUploadState::AssetCreated).with_asset_ref("as-1"),
    );
    provider.assets.insert(
        "as-1".into(),
        AssetSnapshot::new(ProviderAssetState::Ready).with_playback_refs(["pb-1"]),
    );
    provider
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(vec![], CannedProvider::default());
    let (status, body) = app.send(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_stopped_poller() {
    let app = TestApp::new(vec![], CannedProvider::default());
    let (status, body) = app.send(Method::GET, "/ready", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["store"]["status"], "ok");
    assert_eq!(body["checks"]["poller"]["status"], "error");
}

#[tokio::test]
async fn test_ready_with_disabled_poller() {
    let reconciler = ReconcilerConfig {
        enabled: false,
        ..ReconcilerConfig::default()
    };
    let app = TestApp::with_reconciler(vec![], CannedProvider::default(), reconciler);
    let (status, body) = app.send(Method::GET, "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["poller"]["status"], "disabled");
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = TestApp::new(vec![], CannedProvider::default());
    let (_, headers, _) = app.send_raw(Method::GET, "/health", None).await;

    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

// =============================================================================
// Queue
// =============================================================================

#[tokio::test]
async fn test_register_then_get_and_list() {
    let app = TestApp::new(vec![], CannedProvider::default());

    let (status, created) = app
        .send(
            Method::POST,
            "/api/queue",
            Some(json!({ "filename": "talk.mp4", "upload_ref": "up-9" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["upload_status"], "pending");
    assert_eq!(created["upload_progress"], 0);
    assert_eq!(created["extraction_status"], "pending");
    assert_eq!(created["max_retries"], 3);

    let id = created["id"].as_str().unwrap().to_string();
    let (status, fetched) = app.send(Method::GET, &format!("/api/queue/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["upload_ref"], "up-9");

    let (status, listed) = app.send(Method::GET, "/api/queue?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_rejects_invalid_request() {
    let app = TestApp::new(vec![], CannedProvider::default());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/queue",
            Some(json!({ "filename": "", "upload_ref": "up-9" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_failed");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/queue",
            Some(json!({ "filename": "a.mp4", "upload_ref": "up-9", "max_retries": 500 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_get_unknown_item() {
    let app = TestApp::new(vec![], CannedProvider::default());
    let (status, body) = app.send(Method::GET, "/api/queue/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_cancel_then_delete() {
    let app = TestApp::new(vec![item("a", "up-1", UploadStatus::Uploading)], CannedProvider::default());

    // Active items cannot be deleted
    let (status, _) = app.send(Method::DELETE, "/api/queue/a", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.send(Method::POST, "/api/queue/a/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upload_status"], "cancelled");

    let (status, body) = app.send(Method::POST, "/api/queue/a/cancel", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_state_transition");

    let (status, _) = app.send(Method::DELETE, "/api/queue/a", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.stored("a").await.is_none());
}

// =============================================================================
// Admin and reconciliation
// =============================================================================

#[tokio::test]
async fn test_manual_reconcile_completes_and_claims_extraction() {
    let app = TestApp::new(vec![item("a", "up-1", UploadStatus::Uploading)], ready_provider());

    let (status, body) = app.send(Method::POST, "/api/admin/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], 1);
    assert_eq!(body["writes"], 1);
    assert_eq!(body["outcomes"]["completed"], 1);

    let stored = app.stored("a").await.unwrap();
    assert_eq!(stored.upload_status, UploadStatus::Completed);
    assert_eq!(stored.upload_progress, 100);
    assert_eq!(stored.playback_ref.as_deref(), Some("pb-1"));
    assert!(stored.completed_at.is_some());

    // Already claimed by the completion write
    let (status, body) = app
        .send(Method::POST, "/api/admin/queue/a/extraction/start", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triggered"], false);

    // Pipeline reports back
    let (status, body) = app
        .send(
            Method::POST,
            "/api/queue/a/extraction",
            Some(json!({ "status": "processing", "progress": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extraction_progress"], 30);

    let (status, body) = app
        .send(Method::POST, "/api/queue/a/extraction", Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extraction_status"], "completed");
    assert_eq!(body["extraction_progress"], 100);

    // A second tick finds nothing active
    let (_, body) = app.send(Method::POST, "/api/admin/reconcile", None).await;
    assert_eq!(body["active"], 0);
}

#[tokio::test]
async fn test_start_extraction_unknown_item() {
    let app = TestApp::new(vec![], CannedProvider::default());
    let (status, _) = app
        .send(Method::POST, "/api/admin/queue/missing/extraction/start", None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_poller_status() {
    let app = TestApp::new(vec![], CannedProvider::default());
    let (status, body) = app.send(Method::GET, "/api/admin/poller", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["running"], false);
    assert_eq!(body["batch_size"], 5);
    assert_eq!(body["tick_interval_secs"], 10);
}
