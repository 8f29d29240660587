//! Provenance labels and the fixed provenance → confidence table.
//!
//! Confidence is never tuned per item: it is a pure function of where the
//! artifact came from, so the ordering between grounded and ungrounded results
//! is enforced here and nowhere else.

use serde::{Deserialize, Serialize};

/// Confidence below which consumers should show a "verify with official source" notice.
pub const VERIFY_THRESHOLD: f32 = 0.8;

/// Which combination of sources produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Parsed directly from a government source.
    ScrapedOfficial,
    /// Returned by a licensed third-party status API.
    #[serde(rename = "external_status_api")]
    ExternalStatusApi,
    /// Produced by the generative step with no grounding context.
    GeneratedOnly,
    /// Generated content constrained by ground truth.
    FusedOfficialAndGenerated,
    /// Predefined minimal artifact used when generation failed.
    StaticFallback,
}

impl Provenance {
    /// Fixed confidence for this provenance.
    pub const fn confidence(self) -> f32 {
        match self {
            Provenance::ScrapedOfficial => 0.97,
            Provenance::ExternalStatusApi => 0.90,
            Provenance::FusedOfficialAndGenerated => 0.85,
            Provenance::GeneratedOnly => 0.70,
            Provenance::StaticFallback => 0.50,
        }
    }

    /// Whether any authoritative source contributed to the artifact.
    pub const fn is_grounded(self) -> bool {
        matches!(
            self,
            Provenance::ScrapedOfficial | Provenance::ExternalStatusApi | Provenance::FusedOfficialAndGenerated
        )
    }

    /// Whether consumers should ask the user to double-check with an official source.
    pub fn needs_verification(self) -> bool {
        self.confidence() < VERIFY_THRESHOLD
    }

    /// Stable label used in logs and tool output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Provenance::ScrapedOfficial => "scraped_official",
            Provenance::ExternalStatusApi => "external_status_api",
            Provenance::GeneratedOnly => "generated_only",
            Provenance::FusedOfficialAndGenerated => "fused_official_and_generated",
            Provenance::StaticFallback => "static_fallback",
        }
    }

    /// All variants, highest confidence first.
    pub const ALL: [Provenance; 5] = [
        Provenance::ScrapedOfficial,
        Provenance::ExternalStatusApi,
        Provenance::FusedOfficialAndGenerated,
        Provenance::GeneratedOnly,
        Provenance::StaticFallback,
    ];
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
