//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::admin::{get_poller_status, reconcile_now, start_extraction};
use crate::handlers::queue::{cancel_item, delete_item, get_item, list_queue, register_item, update_extraction};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let queue_routes = Router::new()
        .route("/queue", get(list_queue).post(register_item))
        .route("/queue/:id", get(get_item).delete(delete_item))
        .route("/queue/:id/cancel", post(cancel_item))
        // Extraction pipeline write-back
        .route("/queue/:id/extraction", post(update_extraction));

    let admin_routes = Router::new()
        .route("/admin/reconcile", post(reconcile_now))
        .route("/admin/poller", get(get_poller_status))
        .route("/admin/queue/:id/extraction/start", post(start_extraction));

    let api_routes = Router::new().merge(queue_routes).merge(admin_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
