//! Fusion of ground truth with generated content.
//!
//! Ground-truth status fields are copied verbatim and treated as one unit:
//! when a status record is present, both category and duration come from it
//! and the generated guess is discarded. Everything else comes from the
//! generated content. Provenance and confidence are stamped here and nowhere else.

use chrono::Utc;

use crate::model::{
    EnhancedRequirementSet, GeneratedCatalog, GeneratedRequirements, GroundTruthContext, Provenance, StatusCategory,
    VisaTypeCatalog,
};
use crate::query::VisaQuery;

/// Status fields to publish: ground truth if present, otherwise the generated guess.
pub(crate) fn status_fields(
    context: &GroundTruthContext, generated_category: Option<StatusCategory>, generated_duration: Option<u32>,
) -> (Option<StatusCategory>, Option<u32>) {
    match context.status.as_ref().filter(|_| context.is_grounded()) {
        Some(status) => (Some(status.status_category), status.duration_days),
        None => (generated_category, generated_duration),
    }
}

/// Provenance of generated content fused with `context`.
pub fn generated_provenance(context: &GroundTruthContext) -> Provenance {
    if context.is_grounded() { Provenance::FusedOfficialAndGenerated } else { Provenance::GeneratedOnly }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub fn merge_requirements(
    query: &VisaQuery, context: &GroundTruthContext, generated: GeneratedRequirements,
) -> EnhancedRequirementSet {
    let (status_category, duration_days) =
        status_fields(context, generated.status_category, generated.duration_days);
    let provenance = generated_provenance(context);

    if let (Some(truth), Some(guess)) = (context.status.as_ref(), generated.status_category)
        && context.is_grounded()
        && truth.status_category != guess
    {
        tracing::debug!(
            country = %query.country,
            ground_truth = truth.status_category.label(),
            generated = guess.label(),
            "Generated status disagrees with ground truth; keeping ground truth"
        );
    }

    EnhancedRequirementSet {
        country: query.country.trim().to_string(),
        visa_type: query.visa_type_or_any().to_string(),
        nationality: trimmed(query.nationality.as_deref()),
        last_updated: Utc::now(),
        status_category,
        duration_days,
        ground_truth_source: context.source_label,
        stats_summary: context.stats_summary.clone(),
        requirements: generated.requirements,
        general_info: generated.general_info,
        important_notes: generated.important_notes,
        official_sources: generated.official_sources,
        provenance,
        confidence: provenance.confidence(),
    }
}

pub fn merge_catalog(query: &VisaQuery, context: &GroundTruthContext, generated: GeneratedCatalog) -> VisaTypeCatalog {
    let (status_category, duration_days) =
        status_fields(context, generated.status_category, generated.duration_days);
    let provenance = generated_provenance(context);

    VisaTypeCatalog {
        country: query.country.trim().to_string(),
        nationality: trimmed(query.nationality.as_deref()),
        last_updated: Utc::now(),
        status_category,
        duration_days,
        ground_truth_source: context.source_label,
        visa_types: generated.visa_types,
        provenance,
        confidence: provenance.confidence(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fees, GeneralInfo, OfficialVisaStatus, Requirement, SourceLabel, VisaTypeInfo};

    fn visa_free_context() -> GroundTruthContext {
        GroundTruthContext::grounded(
            OfficialVisaStatus {
                passport_country: "us".into(),
                destination_country: "jp".into(),
                status_category: StatusCategory::VisaFree,
                duration_days: Some(90),
                last_verified: Utc::now(),
            },
            Some("Visa-free access to 186 destinations".into()),
            SourceLabel::PrimaryStatusApi,
        )
    }

    fn generated(category: Option<StatusCategory>, duration: Option<u32>) -> GeneratedRequirements {
        GeneratedRequirements {
            status_category: category,
            duration_days: duration,
            requirements: vec![Requirement {
                id: "passport".into(),
                title: "Valid passport".into(),
                description: "Valid for the duration of stay".into(),
                required: true,
                category: "identity".into(),
                formats: None,
                specific_notes: None,
            }],
            general_info: GeneralInfo {
                processing_time: "None".into(),
                validity: "90 days".into(),
                fees: Fees { amount: None, currency: "JPY".into(), payment_methods: None },
                application_methods: vec![],
            },
            important_notes: vec!["Return ticket may be requested".into()],
            official_sources: vec![],
        }
    }

    #[test]
    fn test_ground_truth_never_overridden() {
        let query = VisaQuery::new("jp").with_visa_type("tourist").with_nationality("us");
        let context = visa_free_context();

        let guesses = [
            None,
            Some(StatusCategory::VisaFree),
            Some(StatusCategory::VisaOnArrival),
            Some(StatusCategory::EVisa),
            Some(StatusCategory::VisaRequired),
            Some(StatusCategory::NoAdmission),
        ];
        for guess in guesses {
            let merged = merge_requirements(&query, &context, generated(guess, Some(30)));
            assert_eq!(merged.status_category, Some(StatusCategory::VisaFree));
            assert_eq!(merged.duration_days, Some(90), "duration travels with the ground-truth status");

            let catalog = merge_catalog(
                &query,
                &context,
                GeneratedCatalog { status_category: guess, duration_days: Some(30), visa_types: vec![] },
            );
            assert_eq!(catalog.status_category, Some(StatusCategory::VisaFree));
        }
    }

    #[test]
    fn test_grounded_duration_absent_is_not_filled() {
        let mut context = visa_free_context();
        if let Some(status) = context.status.as_mut() {
            status.duration_days = None;
        }
        let merged = merge_requirements(&VisaQuery::new("jp"), &context, generated(None, Some(30)));
        assert_eq!(merged.duration_days, None);
    }

    #[test]
    fn test_grounded_merge_is_fused() {
        let query = VisaQuery::new(" JP ").with_nationality("us");
        let merged = merge_requirements(&query, &visa_free_context(), generated(None, None));

        assert_eq!(merged.provenance, Provenance::FusedOfficialAndGenerated);
        assert_eq!(merged.confidence, 0.85);
        assert_eq!(merged.ground_truth_source, SourceLabel::PrimaryStatusApi);
        assert_eq!(merged.stats_summary.as_deref(), Some("Visa-free access to 186 destinations"));
        assert_eq!(merged.country, "JP");
        assert_eq!(merged.visa_type, "any");
        assert_eq!(merged.requirements.len(), 1);
    }

    #[test]
    fn test_ungrounded_merge_uses_generated_status() {
        let context = GroundTruthContext::ungrounded(vec!["primary: timeout".into()]);
        let merged =
            merge_requirements(&VisaQuery::new("fr"), &context, generated(Some(StatusCategory::VisaRequired), None));

        assert_eq!(merged.provenance, Provenance::GeneratedOnly);
        assert_eq!(merged.confidence, 0.70);
        assert_eq!(merged.status_category, Some(StatusCategory::VisaRequired));
        assert_eq!(merged.ground_truth_source, SourceLabel::None);
    }

    #[test]
    fn test_catalog_merge() {
        let generated = GeneratedCatalog {
            status_category: None,
            duration_days: None,
            visa_types: vec![VisaTypeInfo {
                id: "working_holiday".into(),
                name: "Working Holiday".into(),
                description: "Travel with incidental work".into(),
                purpose: "tourism".into(),
                typical_duration: Some("1 year".into()),
                allows_work: true,
            }],
        };
        let catalog = merge_catalog(&VisaQuery::new("jp").with_nationality("us"), &visa_free_context(), generated);
        assert_eq!(catalog.provenance, Provenance::FusedOfficialAndGenerated);
        assert_eq!(catalog.nationality.as_deref(), Some("us"));
        assert!(catalog.find("WORKING_HOLIDAY").is_some_and(|v| v.allows_work));
    }
}
