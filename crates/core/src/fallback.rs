//! Generic artifacts served when generation fails and nothing is cached.
//!
//! Ground-truth status fields are still copied in when available; the rest is
//! a conservative, destination-agnostic checklist.

use chrono::Utc;

use crate::merge::status_fields;
use crate::model::{
    EnhancedRequirementSet, Fees, GeneralInfo, GroundTruthContext, Provenance, Requirement, VisaTypeCatalog,
    VisaTypeInfo,
};
use crate::query::VisaQuery;

const STATIC_REQUIREMENTS: &[(&str, &str, &str, &str)] = &[
    ("passport", "Valid passport", "Passport valid for at least six months beyond the intended stay", "identity"),
    ("application_form", "Completed application form", "Signed visa application form for the destination", "application"),
    ("photos", "Passport photographs", "Recent passport-size photographs meeting the destination's specification", "identity"),
    ("proof_of_funds", "Proof of sufficient funds", "Bank statements or sponsorship covering the stay", "financial"),
    ("itinerary", "Travel itinerary", "Return or onward ticket and accommodation details", "travel"),
];

const STATIC_VISA_TYPES: &[(&str, &str, &str, bool)] = &[
    ("tourist", "Tourist visa", "tourism", false),
    ("business", "Business visa", "business", false),
    ("student", "Student visa", "study", false),
    ("work", "Work visa", "employment", true),
    ("transit", "Transit visa", "transit", false),
];

fn verify_notice(country: &str) -> String {
    format!("These are generic requirements. Confirm them with the embassy or consulate of {country} before applying.")
}

/// Requirement set with `StaticFallback` provenance.
pub fn static_requirements(query: &VisaQuery, context: &GroundTruthContext) -> EnhancedRequirementSet {
    let (status_category, duration_days) = status_fields(context, None, None);
    let country = query.country.trim().to_string();
    let provenance = Provenance::StaticFallback;

    let requirements = STATIC_REQUIREMENTS
        .iter()
        .map(|(id, title, description, category)| Requirement {
            id: (*id).into(),
            title: (*title).into(),
            description: (*description).into(),
            required: true,
            category: (*category).into(),
            formats: None,
            specific_notes: None,
        })
        .collect();

    EnhancedRequirementSet {
        important_notes: vec![verify_notice(&country)],
        country,
        visa_type: query.visa_type_or_any().to_string(),
        nationality: query.nationality.as_deref().map(str::trim).map(str::to_string),
        last_updated: Utc::now(),
        status_category,
        duration_days,
        ground_truth_source: context.source_label,
        stats_summary: context.stats_summary.clone(),
        requirements,
        general_info: GeneralInfo {
            processing_time: "Varies".into(),
            validity: "Varies".into(),
            fees: Fees { amount: None, currency: "USD".into(), payment_methods: None },
            application_methods: vec!["embassy".into()],
        },
        official_sources: Vec::new(),
        provenance,
        confidence: provenance.confidence(),
    }
}

/// Visa-type catalog with `StaticFallback` provenance.
pub fn static_catalog(query: &VisaQuery, context: &GroundTruthContext) -> VisaTypeCatalog {
    let (status_category, duration_days) = status_fields(context, None, None);
    let provenance = Provenance::StaticFallback;

    let visa_types = STATIC_VISA_TYPES
        .iter()
        .map(|(id, name, purpose, allows_work)| VisaTypeInfo {
            id: (*id).into(),
            name: (*name).into(),
            description: format!("{name} for {purpose}"),
            purpose: (*purpose).into(),
            typical_duration: None,
            allows_work: *allows_work,
        })
        .collect();

    VisaTypeCatalog {
        country: query.country.trim().to_string(),
        nationality: query.nationality.as_deref().map(str::trim).map(str::to_string),
        last_updated: Utc::now(),
        status_category,
        duration_days,
        ground_truth_source: context.source_label,
        visa_types,
        provenance,
        confidence: provenance.confidence(),
    }
}
