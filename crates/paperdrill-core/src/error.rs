//! Error types shared across the paperdrill crates.
//!
//! `ProviderError` represents failures when talking to external HTTP
//! APIs (LLM backends, Notion). It lives in `paperdrill-core` so the
//! session engine can downcast and classify errors for retry decisions
//! without string matching.

use thiserror::Error;

/// Errors that can occur when interacting with an external API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The model replied, but not with the structured payload we asked for.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Precondition violations in the scheduling core.
///
/// The reachable input space is fully controlled upstream (closed
/// rating enum, non-negative counters), so these fail fast instead of
/// clamping silently.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidInputError {
    #[error("quality must be in 0..=5, got {0}")]
    QualityOutOfRange(u8),

    #[error("ease factor must be finite, got {0}")]
    NonFiniteEaseFactor(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_classification() {
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(ProviderError::ModelNotFound("nope".into()).is_permanent());
        assert!(!ProviderError::Timeout(30).is_permanent());
        assert!(!ProviderError::RateLimited { retry_after_ms: 100 }.is_permanent());
    }

    #[test]
    fn retry_after_hint() {
        assert_eq!(
            ProviderError::RateLimited { retry_after_ms: 5000 }.retry_after_ms(),
            Some(5000)
        );
        assert_eq!(ProviderError::Timeout(30).retry_after_ms(), None);
    }
}
