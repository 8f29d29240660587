//! Ground-truth source error types.

use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::Retryable;

/// Errors from a single ground-truth source. Always soft: the chain logs
/// them and moves on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// Source is missing required configuration (key, URL template).
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Passport/destination pair cannot be expressed for this source.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed")]
    AuthError,

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// The source has no record for this pair.
    #[error("no status for {passport} -> {destination}")]
    NotFound { passport: String, destination: String },

    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("request timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response or page did not contain a recognizable status.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { SourceError::Timeout } else { SourceError::Network(Arc::new(err)) }
    }
}

impl Retryable for SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            SourceError::RateLimited { .. } | SourceError::Timeout | SourceError::Network(_) => true,
            SourceError::HttpError { status } => *status >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SourceError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Map an HTTP status to a source error, or `None` on success.
pub(crate) fn status_error(status: reqwest::StatusCode, headers: &reqwest::header::HeaderMap) -> Option<SourceError> {
    if status.is_success() {
        return None;
    }
    Some(match status.as_u16() {
        401 | 403 => SourceError::AuthError,
        429 => SourceError::RateLimited { retry_after: parse_retry_after(headers) },
        code => SourceError::HttpError { status: code },
    })
}

pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(Duration::from_secs_f64)
}
