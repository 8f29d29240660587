//! Request orchestration: cache, grounding, generation, merge, store.
//!
//! ### Flow for one request
//!
//! 1. Normalize the key and read the tier's store. A fresh entry is returned
//!    without any external call.
//! 2. On a miss, join (or lead) the single-flight for the key. The leader
//!    re-checks the store, then goes upstream.
//! 3. Grounding: the status tier (itself cached) walks the fetch chain.
//! 4. Generation through the generation scheduler, merged with grounding.
//! 5. Stored with a TTL chosen by provenance.
//!
//! ### Recovery when generation fails
//!
//! Expired prior entry (`Origin::StaleCache`) → static fallback when enabled
//! or grounded (`Origin::StaticFallback`, never cached) → `Error::Unavailable`.

mod builder;

pub use builder::VisaServiceBuilder;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use visarag_core::cache::{CacheMaintenance, CacheStats, Domain};
use visarag_core::merge::{merge_catalog, merge_requirements};
use visarag_core::model::{EnhancedRequirementSet, GroundTruthContext, Provenance, VisaTypeCatalog};
use visarag_core::{CacheEntry, CacheKey, CacheStore, Error, Lookup, StatusQuery, TtlPolicy, VisaQuery, fallback};

use crate::generate::EnhancementClient;
use crate::ground_truth::FetchChain;
use crate::optimizer::MaintenanceTargets;
use crate::scheduler::SchedulerStats;
use crate::single_flight::SingleFlight;

/// Where a returned artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Cache,
    Upstream,
    /// Expired entry served because the upstream fetch failed.
    StaleCache,
    StaticFallback,
}

/// An artifact with the provenance and confidence it was served with.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resolved<T> {
    pub artifact: T,
    pub provenance: Provenance,
    pub confidence: f32,
    pub origin: Origin,
}

impl<T> Resolved<T> {
    fn new(artifact: T, provenance: Provenance, origin: Origin) -> Self {
        Self { artifact, provenance, confidence: provenance.confidence(), origin }
    }

    fn from_entry(entry: CacheEntry<T>, origin: Origin) -> Self {
        Self::new(entry.data, entry.provenance, origin)
    }

    /// Whether consumers should show a "verify with official source" notice.
    pub fn needs_verification(&self) -> bool {
        self.provenance.needs_verification() || self.origin == Origin::StaleCache
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Skip the cache read and go upstream. A failed refresh still falls
    /// back to the existing entry.
    pub force_refresh: bool,
}

impl RequestOptions {
    pub fn refresh() -> Self {
        Self { force_refresh: true }
    }
}

/// Store and scheduler counters.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub status: CacheStats,
    pub requirements: CacheStats,
    pub visa_types: CacheStats,
    pub schedulers: Vec<SchedulerStats>,
}

/// A cached artifact of any domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "domain", content = "artifact", rename_all = "snake_case")]
pub enum CachedArtifact {
    Status(GroundTruthContext),
    Requirements(EnhancedRequirementSet),
    VisaTypes(VisaTypeCatalog),
}

/// A fresh cache entry as read without going upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry {
    pub key: String,
    pub provenance: Provenance,
    pub confidence: f32,
    pub age_secs: u64,
    pub remaining_ttl_secs: u64,
    #[serde(flatten)]
    pub artifact: CachedArtifact,
}

type Outcome<T> = Result<Resolved<T>, Error>;

/// One cache tier: its store and the in-flight map for its keys.
struct Tier<T> {
    domain: Domain,
    store: Arc<CacheStore<T>>,
    flight: SingleFlight<Outcome<T>>,
}

impl<T: Clone> Tier<T> {
    fn new(domain: Domain, capacity: usize) -> Self {
        Self { domain, store: Arc::new(CacheStore::new(domain.as_str(), capacity)), flight: SingleFlight::new() }
    }
}

struct Inner {
    status: Tier<GroundTruthContext>,
    requirements: Tier<EnhancedRequirementSet>,
    catalog: Tier<VisaTypeCatalog>,
    ttl: TtlPolicy,
    chain: FetchChain,
    enhancer: Option<EnhancementClient>,
    static_fallback: bool,
}

/// The retrieval-augmented visa data service. Cheap to clone.
#[derive(Clone)]
pub struct VisaService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for VisaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisaService")
            .field("sources", &self.inner.chain.labels())
            .field("generator", &self.inner.enhancer.is_some())
            .field("static_fallback", &self.inner.static_fallback)
            .finish()
    }
}

impl VisaService {
    pub fn builder() -> VisaServiceBuilder {
        VisaServiceBuilder::new()
    }

    /// Detailed requirements for a destination, visa type and nationality.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a bad query; `Unavailable` when generation failed,
    /// nothing was cached and no fallback may be served.
    pub async fn requirements(&self, query: &VisaQuery, options: RequestOptions) -> Outcome<EnhancedRequirementSet> {
        query.validate()?;
        let key = &CacheKey::requirements(query);
        let inner = &*self.inner;

        self.resolve(&inner.requirements, key, options, |prior| async move {
            let context = self.grounding(query).await;
            let generated = match &inner.enhancer {
                Some(enhancer) => enhancer.requirements(query, &context).await.map_err(Error::from),
                None => Err(Error::GenerationFailed("no generator configured".into())),
            };
            match generated {
                Ok(generated) => {
                    let artifact = merge_requirements(query, &context, generated);
                    let provenance = artifact.provenance;
                    Ok(self.store_upstream(&inner.requirements, key, artifact, provenance))
                }
                Err(err) => self.recover(key, prior, err, context.is_grounded(), || {
                    fallback::static_requirements(query, &context)
                }),
            }
        })
        .await
    }

    /// Visa types available at a destination, optionally for one nationality.
    ///
    /// # Errors
    ///
    /// Same as [`VisaService::requirements`].
    pub async fn visa_types(&self, query: &VisaQuery, options: RequestOptions) -> Outcome<VisaTypeCatalog> {
        query.validate()?;
        let key = &CacheKey::visa_types(query);
        let inner = &*self.inner;

        self.resolve(&inner.catalog, key, options, |prior| async move {
            let context = self.grounding(query).await;
            let generated = match &inner.enhancer {
                Some(enhancer) => enhancer.catalog(query, &context).await.map_err(Error::from),
                None => Err(Error::GenerationFailed("no generator configured".into())),
            };
            match generated {
                Ok(generated) => {
                    let artifact = merge_catalog(query, &context, generated);
                    let provenance = artifact.provenance;
                    Ok(self.store_upstream(&inner.catalog, key, artifact, provenance))
                }
                Err(err) => self.recover(key, prior, err, context.is_grounded(), || {
                    fallback::static_catalog(query, &context)
                }),
            }
        })
        .await
    }

    /// Official entry status for a passport at a destination.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a bad query; `GroundTruthUnavailable` when every
    /// source failed and nothing was cached before.
    pub async fn status(
        &self, passport: &str, destination: &str, options: RequestOptions,
    ) -> Outcome<GroundTruthContext> {
        let query = StatusQuery::new(passport.trim(), destination.trim());
        query.validate()?;
        let key = &CacheKey::status(&query);
        let inner = &*self.inner;
        let query = &query;

        self.resolve(&inner.status, key, options, |prior| async move {
            let context = inner.chain.run(query).await;
            if let Some(provenance) = context.provenance() {
                return Ok(self.store_upstream(&inner.status, key, context, provenance));
            }

            let reason = if context.failures.is_empty() {
                "no ground-truth source configured".to_string()
            } else {
                context.failures.join("; ")
            };
            match prior {
                Some(entry) => {
                    tracing::warn!(key = %key, reason = %reason, "all sources failed; serving previous status");
                    let origin = prior_origin(&entry);
                    Ok(Resolved::from_entry(entry, origin))
                }
                None => Err(Error::GroundTruthUnavailable(reason)),
            }
        })
        .await
    }

    /// Read the cache only. Counts as a hit or miss.
    ///
    /// # Errors
    ///
    /// `CacheMiss` when there is no fresh entry; `InvalidInput` for a bad query
    /// or a status read without a nationality.
    pub fn cached(&self, domain: Domain, query: &VisaQuery) -> Result<CachedEntry, Error> {
        query.validate()?;
        match domain {
            Domain::Status => {
                let status = query
                    .status_query()
                    .ok_or_else(|| Error::InvalidInput("status entries need a nationality".into()))?;
                cached_entry(&self.inner.status, &CacheKey::status(&status), CachedArtifact::Status)
            }
            Domain::Requirements => {
                cached_entry(&self.inner.requirements, &CacheKey::requirements(query), CachedArtifact::Requirements)
            }
            Domain::VisaTypes => {
                cached_entry(&self.inner.catalog, &CacheKey::visa_types(query), CachedArtifact::VisaTypes)
            }
        }
    }

    /// Drop every cached artifact for a destination country. Returns the number removed.
    pub fn invalidate_country(&self, country: &str) -> usize {
        let pattern = CacheKey::country_pattern(country);
        let removed = self.stores().iter().map(|store| store.delete_matching(&pattern)).sum();
        tracing::info!(country, removed, "invalidated country");
        removed
    }

    pub fn clear_all(&self) {
        for store in self.stores() {
            store.clear();
        }
        tracing::info!("cleared all caches");
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            status: self.inner.status.store.stats(),
            requirements: self.inner.requirements.store.stats(),
            visa_types: self.inner.catalog.store.stats(),
            schedulers: self.schedulers().iter().map(|s| s.stats()).collect(),
        }
    }

    /// Stores and schedulers for the background optimizer.
    pub fn maintenance_targets(&self) -> MaintenanceTargets {
        MaintenanceTargets { stores: self.stores(), schedulers: self.schedulers() }
    }

    fn stores(&self) -> Vec<Arc<dyn CacheMaintenance>> {
        vec![
            self.inner.status.store.clone() as Arc<dyn CacheMaintenance>,
            self.inner.requirements.store.clone(),
            self.inner.catalog.store.clone(),
        ]
    }

    fn schedulers(&self) -> Vec<crate::scheduler::Scheduler> {
        let mut schedulers = self.inner.chain.schedulers();
        if let Some(enhancer) = &self.inner.enhancer {
            schedulers.push(enhancer.scheduler().clone());
        }
        schedulers
    }

    /// Grounding for a requirements or catalog request. Never fails: without a
    /// nationality there is nothing to look up, and a failed lookup is ungrounded.
    async fn grounding(&self, query: &VisaQuery) -> GroundTruthContext {
        let Some(status_query) = query.status_query() else {
            return GroundTruthContext::ungrounded(Vec::new());
        };
        match self.status(&status_query.passport, &status_query.destination, RequestOptions::default()).await {
            Ok(resolved) => resolved.artifact,
            Err(err) => {
                tracing::debug!(error = %err, "proceeding ungrounded");
                GroundTruthContext::ungrounded(vec![err.to_string()])
            }
        }
    }

    /// Fast-path read, then single-flight with a leader re-check.
    ///
    /// The leader hands `fill` the latest known copy of the key, expired or
    /// not, whichever caller evicted it.
    async fn resolve<T, F, Fut>(&self, tier: &Tier<T>, key: &CacheKey, options: RequestOptions, fill: F) -> Outcome<T>
    where
        T: Clone,
        F: FnOnce(Option<CacheEntry<T>>) -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        if !options.force_refresh {
            match tier.store.lookup(key.as_str()) {
                Lookup::Fresh(entry) => {
                    tracing::debug!(key = %key, provenance = %entry.provenance, "cache hit");
                    return Ok(Resolved::from_entry(entry, Origin::Cache));
                }
                Lookup::Expired(_) => tracing::debug!(key = %key, "cache entry expired"),
                Lookup::Missing => tracing::debug!(key = %key, "cache miss"),
            }
        }

        tier.flight
            .run(key.as_str(), || async move {
                if !options.force_refresh
                    && let Some(entry) = tier.store.peek(key.as_str())
                {
                    return Ok(Resolved::from_entry(entry, Origin::Cache));
                }
                fill(tier.store.last_known(key.as_str())).await
            })
            .await
    }

    fn store_upstream<T: Clone>(
        &self, tier: &Tier<T>, key: &CacheKey, artifact: T, provenance: Provenance,
    ) -> Resolved<T> {
        match self.inner.ttl.ttl_for(tier.domain, provenance) {
            Some(ttl) => {
                tier.store.set(key.as_str(), artifact.clone(), ttl, provenance);
                tracing::info!(key = %key, provenance = %provenance, ttl_secs = ttl.as_secs(), "stored artifact");
            }
            None => tracing::debug!(key = %key, provenance = %provenance, "artifact not cacheable"),
        }
        Resolved::new(artifact, provenance, Origin::Upstream)
    }

    fn recover<T>(
        &self, key: &CacheKey, prior: Option<CacheEntry<T>>, err: Error, grounded: bool, fallback: impl FnOnce() -> T,
    ) -> Outcome<T> {
        if let Some(entry) = prior {
            tracing::warn!(
                key = %key,
                error = %err,
                provenance = %entry.provenance,
                "generation failed; serving cached entry"
            );
            let origin = prior_origin(&entry);
            return Ok(Resolved::from_entry(entry, origin));
        }
        if self.inner.static_fallback || grounded {
            tracing::warn!(key = %key, error = %err, "generation failed; serving static fallback");
            return Ok(Resolved::new(fallback(), Provenance::StaticFallback, Origin::StaticFallback));
        }
        tracing::warn!(key = %key, error = %err, "generation failed; nothing to serve");
        Err(Error::Unavailable(format!("{key}: {err}")))
    }
}

fn cached_entry<T: Clone>(
    tier: &Tier<T>, key: &CacheKey, wrap: fn(T) -> CachedArtifact,
) -> Result<CachedEntry, Error> {
    let entry = tier.store.get_entry(key.as_str()).ok_or_else(|| Error::CacheMiss(key.to_string()))?;
    Ok(CachedEntry {
        key: key.to_string(),
        provenance: entry.provenance,
        confidence: entry.confidence(),
        age_secs: entry.age().as_secs(),
        remaining_ttl_secs: entry.remaining_ttl().as_secs(),
        artifact: wrap(entry.data),
    })
}

/// A prior entry is only still fresh when a forced refresh failed.
fn prior_origin<T>(entry: &CacheEntry<T>) -> Origin {
    if entry.is_expired() { Origin::StaleCache } else { Origin::Cache }
}
