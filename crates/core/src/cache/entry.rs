//! Cache entries and TTL validity.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::model::Provenance;

/// A cached artifact with its capture time, lifetime and provenance.
///
/// `created_at` is monotonic (`tokio::time::Instant`, so a paused test clock
/// drives expiry); `stored_at` is wall-clock and only used for reporting.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub created_at: Instant,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
    pub provenance: Provenance,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, ttl: Duration, provenance: Provenance) -> Self {
        Self { data, created_at: Instant::now(), stored_at: Utc::now(), ttl, provenance }
    }

    /// Confidence is derived from provenance, never stored.
    pub fn confidence(&self) -> f32 {
        self.provenance.confidence()
    }

    /// Valid iff `now - created_at <= ttl`.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) <= self.ttl
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Instant::now())
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time left before expiry (zero once expired).
    pub fn remaining_ttl(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }
}
