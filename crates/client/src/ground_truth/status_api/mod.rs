//! Keyed visa-status HTTP APIs.
//!
//! ### Primary
//!
//! - **Endpoint**: `GET {base}/visa-requirements?passport=..&destination=..`
//! - **Authentication**: `X-API-Key` header.
//! - **Response**: category label, optional duration, optional passport
//!   statistics (rendered into the context's stats summary).
//!
//! ### Secondary
//!
//! - **Endpoint**: `GET {base}/status/{passport}/{destination}`
//! - **Authentication**: bearer token.
//! - **Response**: short code (`VF`, `VOA`, `EV`, `VR`, `NA`) and optional days.
//!
//! Both map 401/403 to `AuthError`, 404 to `NotFound`, 429 to `RateLimited`
//! (with `Retry-After`) and other non-2xx to `HttpError`.

pub mod request;
pub mod response;

pub use request::StatusRequest;
pub use response::{PassportStats, PrimaryApiResponse, SecondaryApiResponse};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use visarag_core::StatusQuery;
use visarag_core::model::SourceLabel;

use super::error::status_error;
use super::{GroundTruthSource, SourceError, SourceHit};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "visarag/0.1";

/// Connection settings shared by both status APIs.
#[derive(Clone)]
pub struct StatusApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl std::fmt::Debug for StatusApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StatusApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Build from the application's per-API section, if it is usable.
    pub fn from_app(config: &visarag_core::config::StatusApiConfig, user_agent: &str, timeout: Duration) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        let api_key = config.api_key.clone()?;
        Some(Self { api_key, base_url: config.base_url.clone(), timeout, user_agent: user_agent.to_string() })
    }

    fn client(&self) -> Result<reqwest::Client, SourceError> {
        if self.api_key.is_empty() {
            return Err(SourceError::NotConfigured("missing API key".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(SourceError::NotConfigured("missing base URL".into()));
        }
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .use_rustls_tls()
            .gzip(true)
            .build()
            .map_err(|e| SourceError::NotConfigured(format!("failed to build HTTP client: {e}")))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response, request: &StatusRequest, source: SourceLabel,
) -> Result<T, SourceError> {
    let status = response.status();
    tracing::debug!(source = %source, status = status.as_u16(), "status API response");

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound {
            passport: request.passport.clone(),
            destination: request.destination.clone(),
        });
    }
    if let Some(err) = status_error(status, response.headers()) {
        return Err(err);
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse(e.to_string()))
}

/// Licensed classification API.
#[derive(Debug, Clone)]
pub struct PrimaryStatusApi {
    http: reqwest::Client,
    config: StatusApiConfig,
}

impl PrimaryStatusApi {
    /// # Errors
    ///
    /// Returns `SourceError::NotConfigured` if the key or base URL is missing.
    pub fn new(config: StatusApiConfig) -> Result<Self, SourceError> {
        Ok(Self { http: config.client()?, config })
    }
}

#[async_trait]
impl GroundTruthSource for PrimaryStatusApi {
    fn label(&self) -> SourceLabel {
        SourceLabel::PrimaryStatusApi
    }

    async fn fetch(&self, query: &StatusQuery) -> Result<SourceHit, SourceError> {
        let request = StatusRequest::from_query(query)?;
        let start = Instant::now();

        let response = self
            .http
            .get(self.config.endpoint("visa-requirements"))
            .header("X-API-Key", &self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .query(&request)
            .send()
            .await?;

        let body: PrimaryApiResponse = read_json(response, &request, self.label()).await?;
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, category = %body.category, "primary status lookup");
        body.into_hit(&request)
    }
}

/// Second provider with short status codes.
#[derive(Debug, Clone)]
pub struct SecondaryStatusApi {
    http: reqwest::Client,
    config: StatusApiConfig,
}

impl SecondaryStatusApi {
    /// # Errors
    ///
    /// Returns `SourceError::NotConfigured` if the key or base URL is missing.
    pub fn new(config: StatusApiConfig) -> Result<Self, SourceError> {
        Ok(Self { http: config.client()?, config })
    }
}

#[async_trait]
impl GroundTruthSource for SecondaryStatusApi {
    fn label(&self) -> SourceLabel {
        SourceLabel::SecondaryStatusApi
    }

    async fn fetch(&self, query: &StatusQuery) -> Result<SourceHit, SourceError> {
        let request = StatusRequest::from_query(query)?;
        let start = Instant::now();

        let response = self
            .http
            .get(self.config.endpoint(&request.path()))
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let body: SecondaryApiResponse = read_json(response, &request, self.label()).await?;
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, code = %body.code, "secondary status lookup");
        body.into_hit(&request)
    }
}
