//! Reconciler error types.

use thiserror::Error;

use mediaq_provider::ProviderError;
use mediaq_store::StoreError;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Reconciliation panicked: {0}")]
    Panicked(String),

    #[error("Extraction dispatch failed: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ReconcileError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Build from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// Faults counted against an item's retry budget: provider faults and
    /// panics. Store faults are not counted.
    pub fn counts_as_item_fault(&self) -> bool {
        matches!(self, ReconcileError::Provider(_) | ReconcileError::Panicked(_))
    }
}
