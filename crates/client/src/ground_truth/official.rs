//! Government page scraper.
//!
//! Fetches a configured official page and reads the entry status from it.
//!
//! ### Page contract
//!
//! - URL comes from `url_template`, with `{destination}` and `{passport}`
//!   replaced by the lowercased, percent-encoded query values.
//! - Status: first element matching `status_selector`. Its
//!   `data-visa-status` attribute wins over its text.
//! - Duration: first element matching `duration_selector` (attribute
//!   `data-visa-duration`, then text), parsed as a bare number or
//!   `N day(s)`. Falls back to a duration mentioned in the status text.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::header;
use scraper::{ElementRef, Html, Selector};
use url::Url;
use visarag_core::StatusQuery;
use visarag_core::config::OfficialConfig;
use visarag_core::model::{OfficialVisaStatus, SourceLabel, StatusCategory};

use super::error::status_error;
use super::{GroundTruthSource, SourceError, SourceHit};

static DAYS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*days?").expect("static regex"));

const STATUS_ATTR: &str = "data-visa-status";
const DURATION_ATTR: &str = "data-visa-duration";

/// Scrapes a status from an official government page.
#[derive(Debug, Clone)]
pub struct OfficialScraper {
    http: reqwest::Client,
    url_template: String,
    status_selector: Selector,
    duration_selector: Selector,
}

fn parse_selector(raw: &str) -> Result<Selector, SourceError> {
    Selector::parse(raw).map_err(|e| SourceError::NotConfigured(format!("invalid selector {raw:?}: {e}")))
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.trim().to_lowercase().as_bytes()).collect()
}

fn element_value(element: ElementRef<'_>, attr: &str) -> String {
    match element.value().attr(attr) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => element.text().collect::<Vec<_>>().join(" ").trim().to_string(),
    }
}

/// Parse `90`, `90 days`, `up to 30 days`. `None` if no number of days is present.
pub fn parse_duration_days(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(days) = raw.parse::<u32>() {
        return Some(days);
    }
    DAYS.captures(raw).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse().ok())
}

impl OfficialScraper {
    /// Build a scraper from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::NotConfigured` if the scraper is disabled, has no
    /// URL template, or a selector does not parse.
    pub fn new(config: &OfficialConfig, user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        if !config.is_configured() {
            return Err(SourceError::NotConfigured("official.url_template is not set".into()));
        }
        let url_template = config.url_template.clone().unwrap_or_default();

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| SourceError::NotConfigured(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url_template,
            status_selector: parse_selector(&config.status_selector)?,
            duration_selector: parse_selector(&config.duration_selector)?,
        })
    }

    /// Page URL for a query.
    pub fn page_url(&self, query: &StatusQuery) -> Result<Url, SourceError> {
        let raw = self
            .url_template
            .replace("{destination}", &encode(&query.destination))
            .replace("{passport}", &encode(&query.passport));
        Url::parse(&raw).map_err(|e| SourceError::InvalidQuery(format!("bad page URL {raw:?}: {e}")))
    }

    /// Read status and duration out of a fetched page.
    pub fn parse_page(&self, html: &str, query: &StatusQuery) -> Result<SourceHit, SourceError> {
        let document = Html::parse_document(html);

        let status_element = document
            .select(&self.status_selector)
            .next()
            .ok_or_else(|| SourceError::Parse("status element not found".into()))?;
        let status_text = element_value(status_element, STATUS_ATTR);
        let category = StatusCategory::parse_loose(&status_text)
            .ok_or_else(|| SourceError::Parse(format!("unrecognized status: {status_text:?}")))?;

        let duration_days = document
            .select(&self.duration_selector)
            .next()
            .and_then(|element| parse_duration_days(&element_value(element, DURATION_ATTR)))
            .or_else(|| parse_duration_days(&status_text));

        Ok(SourceHit::new(OfficialVisaStatus {
            passport_country: query.passport.trim().to_string(),
            destination_country: query.destination.trim().to_string(),
            status_category: category,
            duration_days,
            last_verified: Utc::now(),
        }))
    }
}

#[async_trait]
impl GroundTruthSource for OfficialScraper {
    fn label(&self) -> SourceLabel {
        SourceLabel::OfficialScraper
    }

    async fn fetch(&self, query: &StatusQuery) -> Result<SourceHit, SourceError> {
        let url = self.page_url(query)?;
        tracing::debug!(url = %url, "fetching official page");

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound {
                passport: query.passport.clone(),
                destination: query.destination.clone(),
            });
        }
        if let Some(err) = status_error(response.status(), response.headers()) {
            return Err(err);
        }

        let html = response.text().await?;
        self.parse_page(&html, query)
    }
}
