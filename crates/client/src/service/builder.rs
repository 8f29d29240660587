use std::sync::Arc;

use visarag_core::cache::Domain;
use visarag_core::config::{AppConfig, SourceKind};
use visarag_core::{Error, TtlPolicy};

use super::{Inner, Tier, VisaService};
use crate::generate::{ChatCompletionsClient, EnhancementClient, GenerationError, GenerationPolicy, TextGenerator};
use crate::ground_truth::{
    ChainLink, FetchChain, GroundTruthSource, OfficialScraper, PrimaryStatusApi, SecondaryStatusApi, SourceError,
    StatusApiConfig,
};
use crate::scheduler::{RateBudget, Scheduler};

/// Assembles a [`VisaService`] from parts. Tests inject mock sources and
/// generators here; production goes through [`VisaService::from_config`].
#[derive(Debug)]
pub struct VisaServiceBuilder {
    chain: FetchChain,
    enhancer: Option<EnhancementClient>,
    ttl: TtlPolicy,
    status_capacity: usize,
    requirements_capacity: usize,
    catalog_capacity: usize,
    static_fallback: bool,
}

impl Default for VisaServiceBuilder {
    fn default() -> Self {
        let cache = visarag_core::config::CacheConfig::default();
        Self {
            chain: FetchChain::default(),
            enhancer: None,
            ttl: TtlPolicy::default(),
            status_capacity: cache.status_capacity,
            requirements_capacity: cache.requirements_capacity,
            catalog_capacity: cache.catalog_capacity,
            static_fallback: true,
        }
    }
}

impl VisaServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a ground-truth source. Sources are tried in the order added.
    pub fn source(mut self, link: ChainLink) -> Self {
        self.chain.push(link);
        self
    }

    pub fn generator(
        mut self, generator: Arc<dyn TextGenerator>, scheduler: Scheduler, policy: GenerationPolicy,
    ) -> Self {
        self.enhancer = Some(EnhancementClient::new(generator, scheduler, policy));
        self
    }

    pub fn ttl(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn capacities(mut self, status: usize, requirements: usize, catalog: usize) -> Self {
        self.status_capacity = status;
        self.requirements_capacity = requirements;
        self.catalog_capacity = catalog;
        self
    }

    pub fn static_fallback(mut self, enabled: bool) -> Self {
        self.static_fallback = enabled;
        self
    }

    pub fn build(self) -> VisaService {
        VisaService {
            inner: Arc::new(Inner {
                status: Tier::new(Domain::Status, self.status_capacity),
                requirements: Tier::new(Domain::Requirements, self.requirements_capacity),
                catalog: Tier::new(Domain::VisaTypes, self.catalog_capacity),
                ttl: self.ttl,
                chain: self.chain,
                enhancer: self.enhancer,
                static_fallback: self.static_fallback,
            }),
        }
    }
}

fn source_for(config: &AppConfig, kind: SourceKind) -> Result<Option<Arc<dyn GroundTruthSource>>, SourceError> {
    let timeout = config.ground_truth_timeout();
    let source: Arc<dyn GroundTruthSource> = match kind {
        SourceKind::Official if config.official.is_configured() => {
            Arc::new(OfficialScraper::new(&config.official, &config.user_agent, timeout)?)
        }
        SourceKind::Primary => match StatusApiConfig::from_app(&config.primary_api, &config.user_agent, timeout) {
            Some(api) => Arc::new(PrimaryStatusApi::new(api)?),
            None => return Ok(None),
        },
        SourceKind::Secondary => match StatusApiConfig::from_app(&config.secondary_api, &config.user_agent, timeout) {
            Some(api) => Arc::new(SecondaryStatusApi::new(api)?),
            None => return Ok(None),
        },
        SourceKind::Official => return Ok(None),
    };
    Ok(Some(source))
}

impl VisaService {
    /// Wire sources, schedulers, the generator and the stores from configuration.
    ///
    /// Unconfigured sources are skipped. A missing LLM key leaves the service
    /// without a generator, so requests are served from cache or fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a configured source cannot be built (bad
    /// selector, HTTP client failure).
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let mut builder = VisaServiceBuilder::new()
            .ttl(TtlPolicy::from_config(&config.cache))
            .capacities(config.cache.status_capacity, config.cache.requirements_capacity, config.cache.catalog_capacity)
            .static_fallback(config.static_fallback);

        for kind in &config.source_order {
            let source = source_for(config, *kind).map_err(|e| Error::Config(format!("{}: {e}", kind.as_str())))?;
            let Some(source) = source else {
                tracing::debug!(source = kind.as_str(), "ground-truth source not configured; skipping");
                continue;
            };

            let limits = match kind {
                SourceKind::Official => &config.limits.official,
                SourceKind::Primary => &config.limits.primary_api,
                SourceKind::Secondary => &config.limits.secondary_api,
            };
            let scheduler = Scheduler::new(source.label().as_str(), RateBudget::from_config(limits));
            tracing::info!(source = %source.label(), "ground-truth source enabled");
            builder = builder.source(
                ChainLink::new(source, scheduler)
                    .with_timeout(config.ground_truth_timeout())
                    .with_max_attempts(limits.max_attempts),
            );
        }

        match ChatCompletionsClient::new(&config.llm, &config.user_agent) {
            Ok(client) => {
                tracing::info!(model = client.model(), "generator enabled");
                let scheduler = Scheduler::new("generation", RateBudget::from_config(&config.limits.generation));
                let policy = GenerationPolicy::from_config(&config.llm, &config.limits.generation);
                builder = builder.generator(Arc::new(client), scheduler, policy);
            }
            Err(GenerationError::MissingApiKey) => {
                tracing::warn!("no LLM API key; requests will use cached entries or static fallbacks");
            }
            Err(err) => return Err(Error::Config(format!("llm: {err}"))),
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visarag_core::config::OfficialConfig;
    use visarag_core::model::SourceLabel;

    #[test]
    fn test_from_default_config() {
        let service = VisaService::from_config(&AppConfig::default()).unwrap();
        assert!(service.inner.chain.is_empty());
        assert!(service.inner.enhancer.is_none());
        assert!(service.inner.static_fallback);
        assert_eq!(service.inner.requirements.store.capacity(), 1_000);
    }

    #[test]
    fn test_from_config_respects_source_order() {
        let mut config = AppConfig::default();
        config.source_order = vec![SourceKind::Secondary, SourceKind::Official, SourceKind::Primary];
        config.official =
            OfficialConfig { url_template: Some("https://gov.example/{destination}".into()), ..Default::default() };
        config.primary_api.base_url = "https://primary.test".into();
        config.primary_api.api_key = Some("p".into());
        config.secondary_api.base_url = "https://secondary.test".into();
        config.secondary_api.api_key = Some("s".into());
        config.llm.api_key = Some("sk".into());

        let service = VisaService::from_config(&config).unwrap();
        assert_eq!(
            service.inner.chain.labels(),
            vec![SourceLabel::SecondaryStatusApi, SourceLabel::OfficialScraper, SourceLabel::PrimaryStatusApi]
        );
        assert!(service.inner.enhancer.is_some());

        let names: Vec<String> = service.maintenance_targets().schedulers.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["secondary_status_api", "official_scraper", "primary_status_api", "generation"]);
    }

    #[test]
    fn test_bad_selector_is_config_error() {
        let mut config = AppConfig::default();
        config.official = OfficialConfig {
            url_template: Some("https://gov.example/{destination}".into()),
            status_selector: "[[".into(),
            ..Default::default()
        };
        let err = VisaService::from_config(&config).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
