//! Encoding provider adapter.
//!
//! This crate provides:
//! - The `ProviderAdapter` contract the reconciler polls through
//! - A REST client for the provider's upload and asset endpoints
//! - Per-call retry with exponential backoff and jitter
//! - Request metrics

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod types;


pub use adapter::ProviderAdapter;
pub use client::HttpProviderClient;
pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult};
pub use retry::RetryConfig;
