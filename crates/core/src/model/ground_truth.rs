//! Result of walking the ground-truth fetch chain.

use serde::{Deserialize, Serialize};

use super::provenance::Provenance;
use super::status::OfficialVisaStatus;

/// Which source produced the grounding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceLabel {
    OfficialScraper,
    PrimaryStatusApi,
    SecondaryStatusApi,
    /// Every source failed or none was configured.
    None,
}

impl SourceLabel {
    /// Provenance of a status record produced by this source.
    pub const fn provenance(self) -> Option<Provenance> {
        match self {
            SourceLabel::OfficialScraper => Some(Provenance::ScrapedOfficial),
            SourceLabel::PrimaryStatusApi | SourceLabel::SecondaryStatusApi => Some(Provenance::ExternalStatusApi),
            SourceLabel::None => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SourceLabel::OfficialScraper => "official_scraper",
            SourceLabel::PrimaryStatusApi => "primary_status_api",
            SourceLabel::SecondaryStatusApi => "secondary_status_api",
            SourceLabel::None => "none",
        }
    }
}

impl std::fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-available factual context handed to the generative step.
///
/// Always produced, never an error: an empty context is just the
/// lower-confidence path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruthContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OfficialVisaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_summary: Option<String>,
    pub source_label: SourceLabel,
    /// Soft failures collected while walking the chain, in attempt order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl GroundTruthContext {
    /// Context produced by a successful source.
    pub fn grounded(status: OfficialVisaStatus, stats_summary: Option<String>, source_label: SourceLabel) -> Self {
        Self { status: Some(status), stats_summary, source_label, failures: Vec::new() }
    }

    /// Context with no grounding, carrying the reasons each source failed.
    pub fn ungrounded(failures: Vec<String>) -> Self {
        Self { status: None, stats_summary: None, source_label: SourceLabel::None, failures }
    }

    pub fn is_grounded(&self) -> bool {
        self.status.is_some() && self.source_label != SourceLabel::None
    }

    /// Provenance of the status record itself (not of anything merged with it).
    pub fn provenance(&self) -> Option<Provenance> {
        if self.is_grounded() { self.source_label.provenance() } else { None }
    }
}
