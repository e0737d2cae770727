//! Reconciler configuration.

use std::time::Duration;

/// Reconciliation poller configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Run the background poller at all
    pub enabled: bool,
    /// Wall-clock interval between ticks
    pub tick_interval: Duration,
    /// Items reconciled concurrently, and the size of each batch
    pub batch_size: usize,
    /// Progress reported while the provider prepares the asset
    pub preparing_progress: u8,
    /// How long `stop()` waits for in-flight ticks
    pub shutdown_timeout: Duration,
    /// Extraction pipeline endpoint; unset means log-only dispatch
    pub extraction_url: Option<String>,
    /// Timeout for the extraction start call
    pub extraction_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval: Duration::from_secs(10),
            batch_size: 5,
            preparing_progress: 75,
            shutdown_timeout: Duration::from_secs(30),
            extraction_url: None,
            extraction_timeout: Duration::from_secs(10),
        }
    }
}

impl ReconcilerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("RECONCILER_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            tick_interval: Duration::from_secs(
                std::env::var("RECONCILER_TICK_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs: &u64| *secs > 0)
                    .unwrap_or(10),
            ),
            batch_size: std::env::var("RECONCILER_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(5),
            preparing_progress: std::env::var("RECONCILER_PREPARING_PROGRESS")
                .ok()
                .and_then(|s| s.parse::<u8>().ok())
                .map(|p| p.min(99))
                .unwrap_or(75),
            shutdown_timeout: Duration::from_secs(
                std::env::var("RECONCILER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            extraction_url: std::env::var("EXTRACTION_URL").ok().filter(|s| !s.is_empty()),
            extraction_timeout: Duration::from_secs(
                std::env::var("EXTRACTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_defaults() {
        let config = ReconcilerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.tick_interval, Duration::from_secs(10));
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.preparing_progress, 75);
        assert!(config.extraction_url.is_none());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("RECONCILER_TICK_SECS", "2");
        std::env::set_var("RECONCILER_BATCH_SIZE", "0");
        std::env::set_var("RECONCILER_PREPARING_PROGRESS", "300");
        std::env::set_var("RECONCILER_ENABLED", "false");
        let config = ReconcilerConfig::from_env();
        std::env::remove_var("RECONCILER_TICK_SECS");
        std::env::remove_var("RECONCILER_BATCH_SIZE");
        std::env::remove_var("RECONCILER_PREPARING_PROGRESS");
        std::env::remove_var("RECONCILER_ENABLED");

        assert_eq!(config.tick_interval, Duration::from_secs(2));
        // Zero would stall the worker pool
        assert_eq!(config.batch_size, 5);
        // Out of u8 range, falls back
        assert_eq!(config.preparing_progress, 75);
        assert!(!config.enabled);
    }
}
