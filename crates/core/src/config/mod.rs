//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (VISARAG_*, nested keys split on `__`)
//! 2. TOML config file (if VISARAG_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// A ground-truth source that can appear in `source_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Official,
    Primary,
    Secondary,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceKind::Official => "official",
            SourceKind::Primary => "primary",
            SourceKind::Secondary => "secondary",
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (VISARAG_*)
/// 2. TOML config file (if VISARAG_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-Agent string for outbound HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Serve a generic requirement set when generation fails and nothing is cached.
    ///
    /// Set via VISARAG_STATIC_FALLBACK.
    #[serde(default = "default_true")]
    pub static_fallback: bool,

    /// Priority order of ground-truth sources.
    #[serde(default = "default_source_order")]
    pub source_order: Vec<SourceKind>,

    /// Per-source timeout for ground-truth calls, in milliseconds.
    #[serde(default = "default_ground_truth_timeout_ms")]
    pub ground_truth_timeout_ms: u64,

    /// Background optimizer period, in seconds.
    #[serde(default = "default_optimizer_interval_secs")]
    pub optimizer_interval_secs: u64,

    /// Entries below this confidence are reported by the optimizer.
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,

    #[serde(default)]
    pub official: OfficialConfig,

    #[serde(default)]
    pub primary_api: StatusApiConfig,

    #[serde(default)]
    pub secondary_api: StatusApiConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Government page scraper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficialConfig {
    pub enabled: bool,
    /// Page URL with `{destination}` and `{passport}` placeholders.
    pub url_template: Option<String>,
    pub status_selector: String,
    pub duration_selector: String,
}

impl Default for OfficialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: None,
            status_selector: "[data-visa-status]".into(),
            duration_selector: "[data-visa-duration]".into(),
        }
    }
}

impl OfficialConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && self.url_template.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// A keyed visa-status HTTP API. Both fields are required for the source to be used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl StatusApiConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub grounded_temperature: f32,
    pub ungrounded_temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            timeout_ms: 60_000,
            grounded_temperature: 0.2,
            ungrounded_temperature: 0.7,
            max_tokens: 4_096,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Token bucket, concurrency and retry settings for one external dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_amount: u32,
    pub refill_interval_ms: u64,
    pub max_concurrent: usize,
    #[serde(default)]
    pub min_spacing_ms: u64,
    /// Queue bound before the oldest waiter is dropped. Defaults to `capacity`.
    #[serde(default)]
    pub high_water: Option<usize>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl RateLimitConfig {
    pub const fn new(capacity: u32, refill_interval_ms: u64, max_concurrent: usize, min_spacing_ms: u64) -> Self {
        Self {
            capacity,
            refill_amount: capacity,
            refill_interval_ms,
            max_concurrent,
            min_spacing_ms,
            high_water: None,
            max_attempts: 1,
        }
    }

    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }

    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    pub fn high_water(&self) -> usize {
        self.high_water.unwrap_or(self.capacity as usize)
    }
}

fn default_max_attempts() -> u32 {
    1
}

/// Rate budgets per external dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub official: RateLimitConfig,
    pub primary_api: RateLimitConfig,
    pub secondary_api: RateLimitConfig,
    pub generation: RateLimitConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            official: RateLimitConfig::new(10, 60_000, 2, 500),
            primary_api: RateLimitConfig::new(60, 60_000, 4, 100),
            secondary_api: RateLimitConfig::new(30, 60_000, 2, 200),
            generation: RateLimitConfig::new(20, 60_000, 4, 250).with_max_attempts(2),
        }
    }
}

/// Store capacities and TTL tiers, in entries and seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub status_capacity: usize,
    pub requirements_capacity: usize,
    pub catalog_capacity: usize,
    pub status_ttl_secs: u64,
    pub requirements_grounded_ttl_secs: u64,
    pub requirements_ungrounded_ttl_secs: u64,
    pub catalog_grounded_ttl_secs: u64,
    pub catalog_ungrounded_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            status_capacity: 2_000,
            requirements_capacity: 1_000,
            catalog_capacity: 500,
            status_ttl_secs: 604_800,
            requirements_grounded_ttl_secs: 86_400,
            requirements_ungrounded_ttl_secs: 3_600,
            catalog_grounded_ttl_secs: 604_800,
            catalog_ungrounded_ttl_secs: 86_400,
        }
    }
}

fn default_user_agent() -> String {
    "visarag/0.1".into()
}

fn default_true() -> bool {
    true
}

fn default_source_order() -> Vec<SourceKind> {
    vec![SourceKind::Official, SourceKind::Primary, SourceKind::Secondary]
}

fn default_ground_truth_timeout_ms() -> u64 {
    5_000
}

fn default_optimizer_interval_secs() -> u64 {
    3_600
}

fn default_low_confidence_threshold() -> f32 {
    0.75
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            static_fallback: true,
            source_order: default_source_order(),
            ground_truth_timeout_ms: default_ground_truth_timeout_ms(),
            optimizer_interval_secs: default_optimizer_interval_secs(),
            low_confidence_threshold: default_low_confidence_threshold(),
            official: OfficialConfig::default(),
            primary_api: StatusApiConfig::default(),
            secondary_api: StatusApiConfig::default(),
            llm: LlmConfig::default(),
            limits: LimitsConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn ground_truth_timeout(&self) -> Duration {
        Duration::from_millis(self.ground_truth_timeout_ms)
    }

    pub fn optimizer_interval(&self) -> Duration {
        Duration::from_secs(self.optimizer_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `VISARAG_`
    /// 2. TOML file from `VISARAG_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("VISARAG_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("VISARAG_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Sources from `source_order` that have enough configuration to be called.
    pub fn configured_sources(&self) -> Vec<SourceKind> {
        self.source_order
            .iter()
            .copied()
            .filter(|kind| match kind {
                SourceKind::Official => self.official.is_configured(),
                SourceKind::Primary => self.primary_api.is_configured(),
                SourceKind::Secondary => self.secondary_api.is_configured(),
            })
            .collect()
    }

    /// Check if the LLM key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_llm_api_key(&self) -> Result<&str, ConfigError> {
        self.llm.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| ConfigError::Missing {
            field: "llm.api_key".into(),
            hint: "Set VISARAG_LLM__API_KEY environment variable".into(),
        })
    }
}
