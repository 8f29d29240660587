//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::{AppConfig, RateLimitConfig};
use thiserror::Error;

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value < MIN_TIMEOUT_MS {
        return Err(invalid(field, format!("must be at least {MIN_TIMEOUT_MS}ms")));
    }
    if value > MAX_TIMEOUT_MS {
        return Err(invalid(field, format!("must not exceed 5 minutes ({MAX_TIMEOUT_MS}ms)")));
    }
    Ok(())
}

fn check_nonzero(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than 0"));
    }
    Ok(())
}

fn check_unit(field: &str, value: f32, max: f32) -> Result<(), ConfigError> {
    if !(0.0..=max).contains(&value) {
        return Err(invalid(field, format!("must be between 0 and {max}")));
    }
    Ok(())
}

impl RateLimitConfig {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        check_nonzero(&format!("limits.{name}.capacity"), self.capacity.into())?;
        check_nonzero(&format!("limits.{name}.refill_amount"), self.refill_amount.into())?;
        check_nonzero(&format!("limits.{name}.refill_interval_ms"), self.refill_interval_ms)?;
        check_nonzero(&format!("limits.{name}.max_concurrent"), self.max_concurrent as u64)?;
        check_nonzero(&format!("limits.{name}.max_attempts"), self.max_attempts.into())?;
        if self.high_water == Some(0) {
            return Err(invalid(&format!("limits.{name}.high_water"), "must be greater than 0"));
        }
        if self.refill_amount > self.capacity {
            tracing::warn!(
                limit = name,
                capacity = self.capacity,
                refill_amount = self.refill_amount,
                "refill_amount exceeds capacity; refills are capped at capacity"
            );
        }
        Ok(())
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `user_agent` is empty
    /// - a timeout is below 100ms or above 5 minutes
    /// - a capacity, interval, TTL or attempt budget is 0
    /// - a temperature is outside [0, 2] or the confidence threshold outside [0, 1]
    /// - `source_order` names a source twice
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        check_timeout("ground_truth_timeout_ms", self.ground_truth_timeout_ms)?;
        check_timeout("llm.timeout_ms", self.llm.timeout_ms)?;
        check_nonzero("optimizer_interval_secs", self.optimizer_interval_secs)?;
        check_unit("low_confidence_threshold", self.low_confidence_threshold, 1.0)?;
        check_unit("llm.grounded_temperature", self.llm.grounded_temperature, 2.0)?;
        check_unit("llm.ungrounded_temperature", self.llm.ungrounded_temperature, 2.0)?;
        check_nonzero("llm.max_tokens", self.llm.max_tokens.into())?;

        let mut seen = HashSet::new();
        for kind in &self.source_order {
            if !seen.insert(kind) {
                return Err(invalid("source_order", format!("duplicate source: {}", kind.as_str())));
            }
        }

        self.limits.official.validate("official")?;
        self.limits.primary_api.validate("primary_api")?;
        self.limits.secondary_api.validate("secondary_api")?;
        self.limits.generation.validate("generation")?;

        let cache = &self.cache;
        check_nonzero("cache.status_capacity", cache.status_capacity as u64)?;
        check_nonzero("cache.requirements_capacity", cache.requirements_capacity as u64)?;
        check_nonzero("cache.catalog_capacity", cache.catalog_capacity as u64)?;
        check_nonzero("cache.status_ttl_secs", cache.status_ttl_secs)?;
        check_nonzero("cache.requirements_grounded_ttl_secs", cache.requirements_grounded_ttl_secs)?;
        check_nonzero("cache.requirements_ungrounded_ttl_secs", cache.requirements_ungrounded_ttl_secs)?;
        check_nonzero("cache.catalog_grounded_ttl_secs", cache.catalog_grounded_ttl_secs)?;
        check_nonzero("cache.catalog_ungrounded_ttl_secs", cache.catalog_ungrounded_ttl_secs)?;

        if self.configured_sources().is_empty() {
            tracing::warn!(
                source_order = ?self.source_order,
                "No ground-truth source is configured; every answer will be ungrounded"
            );
        }

        if self.llm.api_key.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("llm.api_key is not set; generation will fail and fall back to cached or static data");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "user_agent");
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { ground_truth_timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()), "ground_truth_timeout_ms");

        let mut config = AppConfig::default();
        config.llm.timeout_ms = 301_000;
        assert_eq!(field_of(config.validate()), "llm.timeout_ms");

        let mut config = AppConfig { ground_truth_timeout_ms: 100, ..Default::default() };
        config.llm.timeout_ms = 300_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_temperature_range() {
        let mut config = AppConfig::default();
        config.llm.ungrounded_temperature = 2.5;
        assert_eq!(field_of(config.validate()), "llm.ungrounded_temperature");

        config.llm.ungrounded_temperature = 2.0;
        config.llm.grounded_temperature = -0.1;
        assert_eq!(field_of(config.validate()), "llm.grounded_temperature");
    }

    #[test]
    fn test_validate_threshold_range() {
        let config = AppConfig { low_confidence_threshold: 1.01, ..Default::default() };
        assert_eq!(field_of(config.validate()), "low_confidence_threshold");
    }

    #[test]
    fn test_validate_duplicate_source() {
        let config =
            AppConfig { source_order: vec![SourceKind::Primary, SourceKind::Primary], ..Default::default() };
        assert_eq!(field_of(config.validate()), "source_order");
    }

    #[test]
    fn test_validate_empty_source_order_is_allowed() {
        let config = AppConfig { source_order: vec![], ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = AppConfig::default();
        config.cache.catalog_capacity = 0;
        assert_eq!(field_of(config.validate()), "cache.catalog_capacity");

        let mut config = AppConfig::default();
        config.limits.generation.capacity = 0;
        assert_eq!(field_of(config.validate()), "limits.generation.capacity");
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = AppConfig::default();
        config.limits.official.refill_interval_ms = 0;
        assert_eq!(field_of(config.validate()), "limits.official.refill_interval_ms");

        let config = AppConfig { optimizer_interval_secs: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "optimizer_interval_secs");
    }

    #[test]
    fn test_validate_zero_high_water() {
        let mut config = AppConfig::default();
        config.limits.secondary_api.high_water = Some(0);
        assert_eq!(field_of(config.validate()), "limits.secondary_api.high_water");
    }
}
