//! Upload reconciliation.
//!
//! This crate provides:
//! - The state mapper from provider states to internal statuses
//! - The bounded retry/failure policy
//! - The extraction trigger and pipeline clients
//! - The reconciliation poller that ties them to the store and provider

pub mod config;
pub mod delta;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod mapper;
pub mod metrics;
pub mod policy;
pub mod poller;

pub use config::ReconcilerConfig;
pub use error::{ReconcileError, ReconcileResult};
pub use extraction::{
    pipeline_from_config, ExtractionPipeline, ExtractionTrigger, HttpExtractionPipeline, LoggingExtractionPipeline,
};
pub use logging::ItemLogger;
pub use mapper::{map_state, MappedState};
pub use policy::{PolicyAction, RetryPolicy};
pub use poller::{ItemOutcome, ReconciliationPoller, TickReport};
