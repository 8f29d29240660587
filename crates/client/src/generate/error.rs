//! Generation error types.

use std::sync::Arc;
use std::time::Duration;

use visarag_core::Error;

use crate::scheduler::{Retryable, ScheduleError, SchedulerError};

/// Errors from one generative call or its output.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Output did not parse or violated the artifact contract.
    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("LLM API key is not configured")]
    MissingApiKey,

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Network(Arc::new(err))
    }
}

impl From<ScheduleError<GenerationError>> for GenerationError {
    fn from(err: ScheduleError<GenerationError>) -> Self {
        match err {
            ScheduleError::Scheduler(err) => GenerationError::Scheduler(err),
            ScheduleError::Task(err) => err,
        }
    }
}

/// Timeouts, missing keys and client errors are final.
impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::RateLimited { .. }
            | GenerationError::Network(_)
            | GenerationError::Malformed(_)
            | GenerationError::EmptyResponse
            | GenerationError::Scheduler(_) => true,
            GenerationError::Http { status, .. } => *status >= 500,
            GenerationError::Timeout(_) | GenerationError::MissingApiKey => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            GenerationError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<GenerationError> for Error {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Timeout(_) => Error::GenerationTimeout(err.to_string()),
            GenerationError::Malformed(_) | GenerationError::EmptyResponse => {
                Error::GenerationMalformed(err.to_string())
            }
            GenerationError::Scheduler(_) => Error::SchedulerOverload(err.to_string()),
            GenerationError::MissingApiKey => Error::Config(err.to_string()),
            _ => Error::GenerationFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(GenerationError::Malformed("x".into()).is_retryable());
        assert!(GenerationError::RateLimited { retry_after: None }.is_retryable());
        assert!(GenerationError::Http { status: 502, message: String::new() }.is_retryable());
        assert!(!GenerationError::Http { status: 400, message: String::new() }.is_retryable());
        assert!(!GenerationError::Timeout(Duration::from_secs(60)).is_retryable());
        assert!(!GenerationError::MissingApiKey.is_retryable());

        let limited = GenerationError::RateLimited { retry_after: Some(Duration::from_secs(5)) };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(5)));
        assert_eq!(GenerationError::EmptyResponse.retry_after(), None);
    }

    #[test]
    fn test_into_core_error() {
        let err: Error = GenerationError::Timeout(Duration::from_secs(1)).into();
        assert_eq!(err.code(), "GENERATION_TIMEOUT");

        let err: Error = GenerationError::EmptyResponse.into();
        assert_eq!(err.code(), "GENERATION_MALFORMED");

        let err: Error = GenerationError::Http { status: 500, message: "boom".into() }.into();
        assert_eq!(err.code(), "GENERATION_FAILED");

        let err: Error = GenerationError::Scheduler(SchedulerError::Overloaded { scheduler: "generation".into() }).into();
        assert_eq!(err.code(), "SCHEDULER_OVERLOAD");
    }

    #[test]
    fn test_flatten_schedule_error() {
        let err: GenerationError = ScheduleError::Task(GenerationError::EmptyResponse).into();
        assert!(matches!(err, GenerationError::EmptyResponse));

        let err: GenerationError =
            ScheduleError::<GenerationError>::Scheduler(SchedulerError::Overloaded { scheduler: "g".into() }).into();
        assert!(matches!(err, GenerationError::Scheduler(_)));
    }
}
