//! Admin handlers for driving and inspecting the reconciliation poller.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use mediaq_models::QueueItemId;

use crate::error::ApiResult;
use crate::state::AppState;

/// Summary of a manually triggered tick.
#[derive(Serialize)]
pub struct ReconcileResponse {
    pub active: usize,
    pub writes: usize,
    pub duration_ms: u64,
    /// Outcome label -> item count
    pub outcomes: BTreeMap<&'static str, usize>,
}

/// Run one reconciliation tick immediately.
pub async fn reconcile_now(State(state): State<AppState>) -> ApiResult<Json<ReconcileResponse>> {
    let report = state.poller.tick_once().await?;

    let mut outcomes = BTreeMap::new();
    for (_, outcome) in &report.outcomes {
        *outcomes.entry(outcome.label()).or_insert(0) += 1;
    }

    info!(
        active = report.active,
        writes = report.writes(),
        "Manual reconciliation tick finished"
    );

    Ok(Json(ReconcileResponse {
        active: report.active,
        writes: report.writes(),
        duration_ms: report.duration.as_millis() as u64,
        outcomes,
    }))
}

#[derive(Serialize)]
pub struct StartExtractionResponse {
    /// False when the stage was already claimed or the upload is not completed
    pub triggered: bool,
}

/// Fire the extraction stage for a completed item.
pub async fn start_extraction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StartExtractionResponse>> {
    let triggered = state.queue_admin.start_extraction(&QueueItemId::from_string(id)).await?;
    Ok(Json(StartExtractionResponse { triggered }))
}

/// Poller status.
#[derive(Serialize)]
pub struct PollerStatusResponse {
    pub enabled: bool,
    pub running: bool,
    pub in_flight: usize,
    pub tick_interval_secs: u64,
    pub batch_size: usize,
}

/// Get the poller status.
pub async fn get_poller_status(State(state): State<AppState>) -> Json<PollerStatusResponse> {
    let config = state.poller.config();
    Json(PollerStatusResponse {
        enabled: config.enabled,
        running: state.poller.is_running(),
        in_flight: state.poller.in_flight(),
        tick_interval_secs: config.tick_interval.as_secs(),
        batch_size: config.batch_size,
    })
}
