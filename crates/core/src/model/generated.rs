//! Shapes the generative step is asked to emit.
//!
//! These double as the JSON Schema sent with the request (via schemars), and
//! `validate()` catches output that parses but violates the contract.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::catalog::VisaTypeInfo;
use super::requirements::{GeneralInfo, OfficialSource, Requirement};
use super::status::StatusCategory;

/// Parsed output that does not satisfy the artifact contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} at index {index} is blank")]
    Blank { field: &'static str, index: usize },

    #[error("duplicate id: {0}")]
    DuplicateId(String),
}

/// Generated requirement content, before merging with ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRequirements {
    /// The model's belief about the entry status; ground truth wins when present.
    #[serde(default)]
    pub status_category: Option<StatusCategory>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    pub requirements: Vec<Requirement>,
    pub general_info: GeneralInfo,
    #[serde(default)]
    pub important_notes: Vec<String>,
    #[serde(default)]
    pub official_sources: Vec<OfficialSource>,
}

impl GeneratedRequirements {
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.requirements.is_empty() {
            return Err(SchemaViolation::Empty("requirements"));
        }

        let mut seen = HashSet::new();
        for (index, req) in self.requirements.iter().enumerate() {
            if req.id.trim().is_empty() {
                return Err(SchemaViolation::Blank { field: "requirements.id", index });
            }
            if req.title.trim().is_empty() {
                return Err(SchemaViolation::Blank { field: "requirements.title", index });
            }
            if !seen.insert(req.id.trim().to_lowercase()) {
                return Err(SchemaViolation::DuplicateId(req.id.clone()));
            }
        }

        for (index, source) in self.official_sources.iter().enumerate() {
            if source.name.trim().is_empty() {
                return Err(SchemaViolation::Blank { field: "officialSources.name", index });
            }
        }

        Ok(())
    }
}

/// Generated visa-type list, before merging with ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCatalog {
    #[serde(default)]
    pub status_category: Option<StatusCategory>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    pub visa_types: Vec<VisaTypeInfo>,
}

impl GeneratedCatalog {
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.visa_types.is_empty() {
            return Err(SchemaViolation::Empty("visaTypes"));
        }

        let mut seen = HashSet::new();
        for (index, visa_type) in self.visa_types.iter().enumerate() {
            if visa_type.id.trim().is_empty() {
                return Err(SchemaViolation::Blank { field: "visaTypes.id", index });
            }
            if visa_type.name.trim().is_empty() {
                return Err(SchemaViolation::Blank { field: "visaTypes.name", index });
            }
            if !seen.insert(visa_type.id.trim().to_lowercase()) {
                return Err(SchemaViolation::DuplicateId(visa_type.id.clone()));
            }
        }

        Ok(())
    }
}
