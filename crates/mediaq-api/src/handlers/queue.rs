//! Queue handlers: intake, listing, cancel, delete and extraction write-back.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use mediaq_models::{ExtractionStatus, QueueItem, QueueItemId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQueueQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// List queue items, most recently updated first.
pub async fn list_queue(
    State(state): State<AppState>,
    Query(query): Query<ListQueueQuery>,
) -> ApiResult<Json<Vec<QueueItem>>> {
    let items = state.queue_admin.list(query.limit, query.offset).await?;
    Ok(Json(items))
}

/// Intake request for a file already handed to the provider.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    /// Provider upload reference returned when the direct upload was created
    #[validate(length(min = 1, max = 128))]
    pub upload_ref: String,
    #[serde(default)]
    #[validate(range(max = 20))]
    pub max_retries: Option<u32>,
}

/// Register a new queue item.
pub async fn register_item(
    State(state): State<AppState>,
    Json(request): Json<RegisterItemRequest>,
) -> ApiResult<(StatusCode, Json<QueueItem>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let item = state
        .queue_admin
        .register(request.filename.trim().to_string(), request.upload_ref, request.max_retries)
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Get a single queue item.
pub async fn get_item(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<QueueItem>> {
    let item = state.queue_admin.get(&QueueItemId::from_string(id)).await?;
    Ok(Json(item))
}

/// Cancel an item that is still pending, uploading or processing.
pub async fn cancel_item(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<QueueItem>> {
    let item = state.queue_admin.cancel(&QueueItemId::from_string(id)).await?;
    Ok(Json(item))
}

/// Delete a terminal item.
pub async fn delete_item(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.queue_admin.delete(&QueueItemId::from_string(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Extraction progress reported back by the pipeline.
#[derive(Debug, Deserialize)]
pub struct ExtractionUpdateRequest {
    pub status: ExtractionStatus,
    #[serde(default)]
    pub progress: Option<u8>,
}

/// Record extraction progress for an item.
pub async fn update_extraction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExtractionUpdateRequest>,
) -> ApiResult<Json<QueueItem>> {
    let item = state
        .queue_admin
        .update_extraction(&QueueItemId::from_string(id), request.status, request.progress)
        .await?;
    Ok(Json(item))
}
