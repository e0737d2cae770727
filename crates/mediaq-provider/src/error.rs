//! Provider error types.

use thiserror::Error;

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised while talking to the encoding provider.
///
/// Every variant is a transport-level fault from the reconciler's point of
/// view: a definitive "this upload failed" verdict arrives as a successful
/// response carrying an `errored`/`cancelled` state, never as an error.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider resource not found: {0}")]
    NotFound(String),

    #[error("Provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Provider server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Unauthorized(body),
            404 => Self::NotFound(body),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, body),
            _ => Self::RequestFailed(format!("HTTP {}: {}", status, body)),
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProviderError::NotFound(_) => Some(404),
            ProviderError::Unauthorized(_) => Some(401),
            ProviderError::RateLimited(_) => Some(429),
            ProviderError::ServerError(code, _) => Some(*code),
            ProviderError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the call is worth repeating immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_)
                | ProviderError::ServerError(_, _)
                | ProviderError::Timeout(_)
                | ProviderError::Network(_)
        )
    }

    /// Delay requested by the provider before the next attempt.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }
}
