//! Axum HTTP API server for the upload queue.
//!
//! This crate provides:
//! - Queue intake, listing, cancel and delete
//! - Extraction progress write-back
//! - Admin endpoints for the reconciliation poller
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::QueueAdmin;
pub use state::AppState;
