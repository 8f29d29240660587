//! Detailed requirements artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ground_truth::SourceLabel;
use super::provenance::Provenance;
use super::status::StatusCategory;

/// A single document or condition the applicant must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub required: bool,
    /// Free-form grouping, e.g. "identity", "financial", "travel".
    pub category: String,
    /// Accepted document formats, when the requirement is a document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<String>>,
    #[serde(default, alias = "notes", skip_serializing_if = "Option::is_none")]
    pub specific_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fees {
    /// `None` when the fee varies or is unknown.
    #[serde(default)]
    pub amount: Option<f64>,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_methods: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneralInfo {
    pub processing_time: String,
    pub validity: String,
    pub fees: Fees,
    pub application_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfficialSource {
    pub name: String,
    pub website: String,
}

/// Requirements for one (country, visa type, nationality) request, with the
/// provenance and confidence consumers use to decide how to present it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedRequirementSet {
    pub country: String,
    pub visa_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_category: Option<StatusCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    pub ground_truth_source: SourceLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_summary: Option<String>,
    pub requirements: Vec<Requirement>,
    pub general_info: GeneralInfo,
    pub important_notes: Vec<String>,
    pub official_sources: Vec<OfficialSource>,
    pub provenance: Provenance,
    pub confidence: f32,
}

impl EnhancedRequirementSet {
    /// Number of mandatory requirements.
    pub fn required_count(&self) -> usize {
        self.requirements.iter().filter(|r| r.required).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_JSON: &str = r#"{
        "id": "passport",
        "title": "Valid passport",
        "description": "Passport valid for six months beyond the stay",
        "required": true,
        "category": "identity",
        "notes": "Two blank pages"
    }"#;

    #[test]
    fn test_requirement_notes_alias() {
        let req: Requirement = serde_json::from_str(FIXTURE_JSON).unwrap();
        assert_eq!(req.specific_notes.as_deref(), Some("Two blank pages"));
        assert!(req.formats.is_none());

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["specificNotes"], "Two blank pages");
        assert!(value.get("formats").is_none());
    }

    #[test]
    fn test_fees_without_amount() {
        let fees: Fees = serde_json::from_str(r#"{"currency": "EUR"}"#).unwrap();
        assert!(fees.amount.is_none());
        assert_eq!(fees.currency, "EUR");
    }
}
