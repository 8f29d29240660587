//! Visa-type catalog artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ground_truth::SourceLabel;
use super::provenance::Provenance;
use super::status::StatusCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisaTypeInfo {
    /// Short slug, e.g. "tourist", "business".
    pub id: String,
    pub name: String,
    pub description: String,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typical_duration: Option<String>,
    #[serde(default)]
    pub allows_work: bool,
}

/// Visa types available in a destination, optionally for one nationality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisaTypeCatalog {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_category: Option<StatusCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    pub ground_truth_source: SourceLabel,
    pub visa_types: Vec<VisaTypeInfo>,
    pub provenance: Provenance,
    pub confidence: f32,
}

impl VisaTypeCatalog {
    pub fn find(&self, id: &str) -> Option<&VisaTypeInfo> {
        self.visa_types.iter().find(|v| v.id.eq_ignore_ascii_case(id))
    }
}
