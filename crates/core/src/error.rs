//! Unified error types for visarag.
//!
//! Each variant carries a stable code prefix in its message and maps to a
//! JSON-RPC error code for the tool surface.

use rmcp::model::{ErrorCode, ErrorData as McpError};

use crate::config::ConfigError;

/// Unified error types for the visa data service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Invalid request parameters (blank country, over-long fields).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No fresh cache entry for the key. Control flow only.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Every ground-truth source failed or was skipped.
    #[error("GROUND_TRUTH_UNAVAILABLE: {0}")]
    GroundTruthUnavailable(String),

    /// The generative call did not finish in time.
    #[error("GENERATION_TIMEOUT: {0}")]
    GenerationTimeout(String),

    /// Generated output could not be parsed or violated the schema.
    #[error("GENERATION_MALFORMED: {0}")]
    GenerationMalformed(String),

    /// Transport or provider failure during generation.
    #[error("GENERATION_FAILED: {0}")]
    GenerationFailed(String),

    /// A scheduler queue was full and this task was dropped.
    #[error("SCHEDULER_OVERLOAD: {0}")]
    SchedulerOverload(String),

    /// Nothing could be produced: no grounding, no generation, no cached entry, no fallback.
    #[error("UNAVAILABLE: {0}")]
    Unavailable(String),

    #[error("CONFIG_ERROR: {0}")]
    Config(String),
}

impl Error {
    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::GroundTruthUnavailable(_)
                | Error::GenerationTimeout(_)
                | Error::GenerationMalformed(_)
                | Error::GenerationFailed(_)
                | Error::SchedulerOverload(_)
                | Error::Unavailable(_)
        )
    }

    /// Stable code prefix, e.g. `GENERATION_TIMEOUT`.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::CacheMiss(_) => "CACHE_MISS",
            Error::GroundTruthUnavailable(_) => "GROUND_TRUTH_UNAVAILABLE",
            Error::GenerationTimeout(_) => "GENERATION_TIMEOUT",
            Error::GenerationMalformed(_) => "GENERATION_MALFORMED",
            Error::GenerationFailed(_) => "GENERATION_FAILED",
            Error::SchedulerOverload(_) => "SCHEDULER_OVERLOAD",
            Error::Unavailable(_) => "UNAVAILABLE",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::GroundTruthUnavailable(msg) => (-32002, msg.clone()),
            Error::GenerationTimeout(msg) => (-32003, msg.clone()),
            Error::GenerationMalformed(msg) => (-32004, msg.clone()),
            Error::GenerationFailed(msg) => (-32005, msg.clone()),
            Error::SchedulerOverload(msg) => (-32006, msg.clone()),
            Error::Unavailable(msg) => (-32007, msg.clone()),
            Error::Config(msg) => (-32008, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: format!("{}: {message}", err.code()).into(), data: None }
    }
}
