//! Provider REST client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info_span, Instrument};

use mediaq_models::{AssetSnapshot, UploadSnapshot};

use crate::adapter::ProviderAdapter;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::metrics::record_request;
use crate::retry::with_retry;
use crate::types::{AssetResource, Envelope, UploadResource};

// =============================================================================
// Client
// =============================================================================

/// REST client for the encoding provider's upload and asset endpoints.
#[derive(Clone)]
pub struct HttpProviderClient {
    http: Client,
    config: ProviderConfig,
}

impl HttpProviderClient {
    /// Create a new provider client.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("mediaq-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env())
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn get_resource<T: DeserializeOwned>(&self, operation: &str, path: &str) -> ProviderResult<T> {
        let url = format!("{}{}", self.config.base_url, path);

        with_retry(&self.config.retry, operation, || {
            self.execute_request(operation, self.fetch::<T>(&url))
        })
        .await
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> ProviderResult<T> {
        debug!("GET {}", url);

        let mut request = self.http.get(url);
        if let Some(token_id) = &self.config.token_id {
            request = request.basic_auth(token_id, self.config.token_secret.as_deref());
        }

        let response = request.send().await.map_err(|e| self.map_transport_error(e))?;
        let status = response.status();

        match status {
            StatusCode::OK => {
                let body = response.text().await.map_err(|e| self.map_transport_error(e))?;
                let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
                    ProviderError::invalid_response(format!(
                        "{} returned malformed body: {} (body prefix: {})",
                        url,
                        e,
                        body.chars().take(200).collect::<String>()
                    ))
                })?;
                Ok(envelope.data)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_ms = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs * 1000)
                    .unwrap_or(1000);
                Err(ProviderError::RateLimited(retry_after_ms))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::from_http_status(
                    status.as_u16(),
                    format!("{} failed: {}", url, body),
                ))
            }
        }
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.config.timeout.as_secs())
        } else {
            ProviderError::Network(error)
        }
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(&self, operation: &str, fut: F) -> ProviderResult<T>
    where
        F: std::future::Future<Output = ProviderResult<T>>,
    {
        let span = info_span!("provider_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, latency_ms);

        result
    }
}

// =============================================================================
// Provider Adapter
// =============================================================================

#[async_trait]
impl ProviderAdapter for HttpProviderClient {
    async fn get_upload_state(&self, upload_ref: &str) -> ProviderResult<UploadSnapshot> {
        let resource: UploadResource = self
            .get_resource("get_upload", &format!("/video/v1/uploads/{}", upload_ref))
            .await?;
        Ok(resource.into())
    }

    async fn get_asset_state(&self, asset_ref: &str) -> ProviderResult<AssetSnapshot> {
        let resource: AssetResource = self
            .get_resource("get_asset", &format!("/video/v1/assets/{}", asset_ref))
            .await?;
        Ok(resource.into())
    }
}
