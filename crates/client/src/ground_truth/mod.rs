//! Ground-truth sources and the chain that walks them.
//!
//! Each source answers one question: what is the entry status for this
//! passport at this destination? Sources are tried strictly in priority
//! order by [`FetchChain`]; the first success wins and later sources are
//! never called.

pub mod chain;
pub mod error;
pub mod official;
pub mod status_api;

pub use chain::{ChainLink, FetchChain};
pub use error::SourceError;
pub use official::OfficialScraper;
pub use status_api::{PrimaryStatusApi, SecondaryStatusApi, StatusApiConfig};

use async_trait::async_trait;
use visarag_core::StatusQuery;
use visarag_core::model::{OfficialVisaStatus, SourceLabel};

/// A successful answer from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceHit {
    pub status: OfficialVisaStatus,
    pub stats_summary: Option<String>,
}

impl SourceHit {
    pub fn new(status: OfficialVisaStatus) -> Self {
        Self { status, stats_summary: None }
    }

    pub fn with_stats_summary(mut self, summary: impl Into<String>) -> Self {
        self.stats_summary = Some(summary.into());
        self
    }
}

/// One typed ground-truth source.
#[async_trait]
pub trait GroundTruthSource: Send + Sync {
    fn label(&self) -> SourceLabel;

    async fn fetch(&self, query: &StatusQuery) -> Result<SourceHit, SourceError>;
}
