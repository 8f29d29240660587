//! Rate budget for one external dependency.

use std::time::Duration;

use visarag_core::config::RateLimitConfig;

/// Token bucket plus concurrency, spacing and queue bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateBudget {
    pub capacity: u32,
    pub initial_tokens: u32,
    pub refill_interval: Duration,
    pub refill_amount: u32,
    pub max_concurrent: usize,
    pub min_spacing: Duration,
    /// Queued tasks allowed before the oldest is dropped.
    pub high_water: usize,
    /// Upper bound on an upstream `Retry-After` honoured between attempts.
    pub max_retry_wait: Duration,
}

const DEFAULT_MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

impl RateBudget {
    /// Full bucket, refilled to capacity every `refill_interval`, no spacing,
    /// concurrency and queue bound equal to `capacity`.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            initial_tokens: capacity,
            refill_interval,
            refill_amount: capacity,
            max_concurrent: capacity as usize,
            min_spacing: Duration::ZERO,
            high_water: capacity as usize,
            max_retry_wait: DEFAULT_MAX_RETRY_WAIT,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            capacity: config.capacity,
            initial_tokens: config.capacity,
            refill_interval: config.refill_interval(),
            refill_amount: config.refill_amount,
            max_concurrent: config.max_concurrent,
            min_spacing: config.min_spacing(),
            high_water: config.high_water(),
            max_retry_wait: DEFAULT_MAX_RETRY_WAIT,
        }
    }

    pub fn with_initial_tokens(mut self, tokens: u32) -> Self {
        self.initial_tokens = tokens.min(self.capacity);
        self
    }

    pub fn with_refill_amount(mut self, amount: u32) -> Self {
        self.refill_amount = amount;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_min_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing = spacing;
        self
    }

    pub fn with_high_water(mut self, high_water: usize) -> Self {
        self.high_water = high_water;
        self
    }

    pub fn with_max_retry_wait(mut self, wait: Duration) -> Self {
        self.max_retry_wait = wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = RateLimitConfig::new(10, 60_000, 2, 500);
        let budget = RateBudget::from_config(&config);
        assert_eq!(budget.capacity, 10);
        assert_eq!(budget.initial_tokens, 10);
        assert_eq!(budget.refill_interval, Duration::from_secs(60));
        assert_eq!(budget.max_concurrent, 2);
        assert_eq!(budget.min_spacing, Duration::from_millis(500));
        assert_eq!(budget.high_water, 10);
        assert_eq!(budget.max_retry_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_initial_tokens_capped() {
        let budget = RateBudget::new(3, Duration::from_secs(1)).with_initial_tokens(10);
        assert_eq!(budget.initial_tokens, 3);
    }
}
