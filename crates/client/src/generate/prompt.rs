//! Prompt assembly for the generative step.
//!
//! The grounding context is embedded as JSON. When it carries a status
//! record the model is told that record is authoritative; the merger
//! enforces that regardless of what comes back.

use visarag_core::VisaQuery;
use visarag_core::model::GroundTruthContext;

use super::types::ChatMessage;

const SYSTEM_PROMPT: &str = "You are a visa requirements assistant. \
    Answer with a single JSON object that matches the provided schema. \
    Do not wrap it in prose. Use camelCase field names. \
    Prefer official government sources and say so when information may vary.";

fn context_block(context: &GroundTruthContext) -> String {
    if !context.is_grounded() {
        return "No verified entry-status data is available for this request. \
                Give your best general guidance and leave statusCategory empty if unsure."
            .to_string();
    }
    let json = serde_json::to_string_pretty(context).unwrap_or_default();
    format!(
        "Verified ground truth (authoritative; do not contradict statusCategory or durationDays):\n```json\n{json}\n```"
    )
}

fn subject(query: &VisaQuery) -> String {
    match query.nationality.as_deref().map(str::trim) {
        Some(nationality) if !nationality.is_empty() => {
            format!("destination {} for a {} passport holder", query.country.trim(), nationality)
        }
        _ => format!("destination {}", query.country.trim()),
    }
}

/// Messages for a detailed requirements request.
pub fn requirements_messages(query: &VisaQuery, context: &GroundTruthContext) -> Vec<ChatMessage> {
    let user = format!(
        "List the application requirements for a {} visa to {}.\n\n{}\n\n\
         Include every required document, general information (processing time, validity, fees, \
         application methods), important notes and official sources.",
        query.visa_type_or_any(),
        subject(query),
        context_block(context)
    );
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Messages for a visa-type catalog request.
pub fn catalog_messages(query: &VisaQuery, context: &GroundTruthContext) -> Vec<ChatMessage> {
    let user = format!(
        "List the visa types available for {}.\n\n{}\n\n\
         Give each a short lowercase id, a name, a description, its purpose, a typical duration \
         and whether it allows work.",
        subject(query),
        context_block(context)
    );
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
