//! Priority-ordered walk over ground-truth sources.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use visarag_core::StatusQuery;
use visarag_core::model::{GroundTruthContext, SourceLabel};

use super::{GroundTruthSource, SourceError};
use crate::scheduler::Scheduler;

/// Default per-call timeout for a source.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(5);

/// A source bound to its own scheduler and timeout.
#[derive(Clone)]
pub struct ChainLink {
    pub source: Arc<dyn GroundTruthSource>,
    pub scheduler: Scheduler,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl std::fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainLink")
            .field("source", &self.source.label())
            .field("scheduler", &self.scheduler.name())
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl ChainLink {
    pub fn new(source: Arc<dyn GroundTruthSource>, scheduler: Scheduler) -> Self {
        Self { source, scheduler, timeout: DEFAULT_SOURCE_TIMEOUT, max_attempts: 1 }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Ordered list of sources. The first success short-circuits the rest.
#[derive(Debug, Clone, Default)]
pub struct FetchChain {
    links: Vec<ChainLink>,
}

impl FetchChain {
    pub fn new(links: Vec<ChainLink>) -> Self {
        Self { links }
    }

    pub fn push(&mut self, link: ChainLink) {
        self.links.push(link);
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn labels(&self) -> Vec<SourceLabel> {
        self.links.iter().map(|link| link.source.label()).collect()
    }

    pub fn schedulers(&self) -> Vec<Scheduler> {
        self.links.iter().map(|link| link.scheduler.clone()).collect()
    }

    /// Walk the sources in order. Never fails: an empty context is the
    /// ungrounded path, with every soft failure recorded in `failures`.
    pub async fn run(&self, query: &StatusQuery) -> GroundTruthContext {
        let mut failures = Vec::new();

        for link in &self.links {
            let label = link.source.label();
            let start = Instant::now();
            let source = &link.source;
            let timeout = link.timeout;

            let result = link
                .scheduler
                .schedule(link.max_attempts, move |attempt| async move {
                    tracing::debug!(source = %label, attempt, "querying ground-truth source");
                    match tokio::time::timeout(timeout, source.fetch(query)).await {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::Timeout),
                    }
                })
                .await;

            match result {
                Ok(hit) => {
                    tracing::info!(
                        source = %label,
                        passport = %query.passport,
                        destination = %query.destination,
                        category = hit.status.status_category.label(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "ground truth resolved"
                    );
                    return GroundTruthContext {
                        status: Some(hit.status),
                        stats_summary: hit.stats_summary,
                        source_label: label,
                        failures,
                    };
                }
                Err(err) => {
                    tracing::warn!(
                        source = %label,
                        passport = %query.passport,
                        destination = %query.destination,
                        error = %err,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "ground-truth source failed; trying next"
                    );
                    failures.push(format!("{label}: {err}"));
                }
            }
        }

        GroundTruthContext::ungrounded(failures)
    }
}
