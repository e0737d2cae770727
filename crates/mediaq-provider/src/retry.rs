//! Per-call retry with exponential backoff and jitter.
//!
//! This covers blips within a single provider call (a dropped connection,
//! a 503, a 429). Faults that outlive these attempts surface to the
//! reconciler, whose policy counts them against the item's retry budget.

use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use crate::error::{ProviderError, ProviderResult};
use crate::metrics::record_retry;

// =============================================================================
// Configuration
// =============================================================================

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: std::env::var("PROVIDER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            base_delay_ms: std::env::var("PROVIDER_RETRY_BASE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.base_delay_ms),
            max_delay_ms: std::env::var("PROVIDER_RETRY_MAX_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_delay_ms),
        }
    }

    /// Disable in-call retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

// =============================================================================
// Retry Execution
// =============================================================================

/// Execute a provider call with retry.
///
/// Retries on network errors, timeouts, 429 (honoring the requested delay)
/// and 5xx. Everything else is returned immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> ProviderResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ProviderResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        let span = info_span!("provider_call", operation = %operation, attempt = attempt + 1);

        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());

                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Provider call failed, retrying: {}",
                    e
                );

                record_retry(operation);

                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| ProviderError::request_failed("retries exhausted")))
}

// =============================================================================
// Backoff
// =============================================================================

/// Calculate retry delay with exponential backoff and full jitter.
fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after);
    }

    let exp_delay = config.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    let capped_delay = exp_delay.min(config.max_delay_ms);

    // Time-derived jitter
    let jittered = if capped_delay > 0 {
        use std::time::SystemTime;
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let random_factor = (nanos % 1000) as f64 / 1000.0;
        ((capped_delay as f64) * random_factor) as u64
    } else {
        0
    };

    Duration::from_millis(jittered.max(config.base_delay_ms.min(capped_delay)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay_ms, 200);
        assert_eq!(config.max_delay_ms, 2000);
    }

    #[test]
    fn test_calculate_delay_with_retry_after() {
        let config = RetryConfig::default();
        assert_eq!(calculate_delay(&config, 0, Some(1500)), Duration::from_millis(1500));
    }

    #[test]
    fn test_calculate_delay_respects_bounds() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 400,
        };
        for attempt in 0..10 {
            let delay = calculate_delay(&config, attempt, None);
            assert!(delay <= Duration::from_millis(400));
            assert!(delay >= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(), "get_upload", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ProviderError::ServerError(503, "busy".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let result: ProviderResult<()> = with_retry(&fast(), "get_upload", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::NotFound("up-1".into())) }
        })
        .await;

        assert!(matches!(result, Err(ProviderError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: ProviderResult<()> = with_retry(&fast(), "get_asset", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Timeout(1)) }
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Timeout(1))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
