//! Provider client configuration.

use std::time::Duration;

use crate::retry::RetryConfig;

/// Configuration for the provider REST client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub base_url: String,
    /// Access token id (basic auth user)
    pub token_id: Option<String>,
    /// Access token secret (basic auth password)
    pub token_secret: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// In-call retry configuration
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mux.com".to_string(),
            token_id: None,
            token_secret: None,
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("PROVIDER_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            token_id: std::env::var("PROVIDER_TOKEN_ID").ok().filter(|s| !s.is_empty()),
            token_secret: std::env::var("PROVIDER_TOKEN_SECRET").ok().filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(
                std::env::var("PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            connect_timeout: defaults.connect_timeout,
            retry: RetryConfig::from_env(),
        }
    }

    /// Point the client at another base URL (mock servers, staging).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_credentials(mut self, token_id: impl Into<String>, token_secret: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self.token_secret = Some(token_secret.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.base_url, "https://api.mux.com");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.token_id.is_none());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("PROVIDER_BASE_URL", "http://localhost:9000/");
        std::env::set_var("PROVIDER_TIMEOUT_SECS", "3");
        std::env::set_var("PROVIDER_TOKEN_ID", "");
        let config = ProviderConfig::from_env();
        std::env::remove_var("PROVIDER_BASE_URL");
        std::env::remove_var("PROVIDER_TIMEOUT_SECS");
        std::env::remove_var("PROVIDER_TOKEN_ID");

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.token_id.is_none());
    }
}
