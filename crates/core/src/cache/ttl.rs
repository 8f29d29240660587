//! TTL tiers per artifact type and provenance.

use std::time::Duration;

use super::key::Domain;
use crate::config::CacheConfig;
use crate::model::Provenance;

const HOUR: u64 = 3_600;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Lifetime table. `None` means "do not cache".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub status: Duration,
    pub requirements_grounded: Duration,
    pub requirements_ungrounded: Duration,
    pub catalog_grounded: Duration,
    pub catalog_ungrounded: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(WEEK),
            requirements_grounded: Duration::from_secs(DAY),
            requirements_ungrounded: Duration::from_secs(HOUR),
            catalog_grounded: Duration::from_secs(WEEK),
            catalog_ungrounded: Duration::from_secs(DAY),
        }
    }
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            status: Duration::from_secs(config.status_ttl_secs),
            requirements_grounded: Duration::from_secs(config.requirements_grounded_ttl_secs),
            requirements_ungrounded: Duration::from_secs(config.requirements_ungrounded_ttl_secs),
            catalog_grounded: Duration::from_secs(config.catalog_grounded_ttl_secs),
            catalog_ungrounded: Duration::from_secs(config.catalog_ungrounded_ttl_secs),
        }
    }

    /// TTL for an artifact in `domain` with the given provenance.
    ///
    /// Static fallbacks are never cached; status entries only exist when a
    /// source actually answered.
    pub fn ttl_for(&self, domain: Domain, provenance: Provenance) -> Option<Duration> {
        match (domain, provenance) {
            (_, Provenance::StaticFallback) => None,
            (Domain::Status, Provenance::ScrapedOfficial | Provenance::ExternalStatusApi) => Some(self.status),
            (Domain::Status, _) => None,
            (Domain::Requirements, Provenance::GeneratedOnly) => Some(self.requirements_ungrounded),
            (Domain::Requirements, _) => Some(self.requirements_grounded),
            (Domain::VisaTypes, Provenance::GeneratedOnly) => Some(self.catalog_ungrounded),
            (Domain::VisaTypes, _) => Some(self.catalog_grounded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for(Domain::Status, Provenance::ScrapedOfficial), Some(Duration::from_secs(604_800)));
        assert_eq!(
            policy.ttl_for(Domain::Requirements, Provenance::FusedOfficialAndGenerated),
            Some(Duration::from_secs(86_400))
        );
        assert_eq!(policy.ttl_for(Domain::Requirements, Provenance::GeneratedOnly), Some(Duration::from_secs(3_600)));
        assert_eq!(
            policy.ttl_for(Domain::VisaTypes, Provenance::FusedOfficialAndGenerated),
            Some(Duration::from_secs(604_800))
        );
        assert_eq!(policy.ttl_for(Domain::VisaTypes, Provenance::GeneratedOnly), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_static_fallback_never_cached() {
        let policy = TtlPolicy::default();
        for domain in [Domain::Status, Domain::Requirements, Domain::VisaTypes] {
            assert_eq!(policy.ttl_for(domain, Provenance::StaticFallback), None);
        }
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig { requirements_ungrounded_ttl_secs: 60, ..Default::default() };
        let policy = TtlPolicy::from_config(&config);
        assert_eq!(policy.requirements_ungrounded, Duration::from_secs(60));
        assert_eq!(policy.status, Duration::from_secs(604_800));
    }
}
