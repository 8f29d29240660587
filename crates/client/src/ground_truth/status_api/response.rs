//! Status API response types and normalization.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use visarag_core::model::{OfficialVisaStatus, StatusCategory};

use super::request::StatusRequest;
use crate::ground_truth::{SourceError, SourceHit};

/// Raw response from the primary (licensed classification) API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryApiResponse {
    pub category: String,
    #[serde(default, alias = "durationDays")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub passport_stats: Option<PassportStats>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Aggregate mobility figures for a passport.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportStats {
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub visa_free_count: Option<u32>,
    #[serde(default)]
    pub total_destinations: Option<u32>,
}

impl PassportStats {
    /// One-line summary, or `None` if the provider sent no figures.
    pub fn summary(&self, passport: &str) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(rank) = self.rank {
            parts.push(format!("global rank {rank}"));
        }
        match (self.visa_free_count, self.total_destinations) {
            (Some(free), Some(total)) => parts.push(format!("visa-free access to {free} of {total} destinations")),
            (Some(free), None) => parts.push(format!("visa-free access to {free} destinations")),
            _ => {}
        }
        if parts.is_empty() { None } else { Some(format!("{passport} passport: {}", parts.join("; "))) }
    }
}

/// Raw response from the secondary API: short status codes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryApiResponse {
    pub code: String,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn category(raw: &str) -> Result<StatusCategory, SourceError> {
    StatusCategory::parse_loose(raw).ok_or_else(|| SourceError::Parse(format!("unrecognized status: {raw:?}")))
}

fn status(
    request: &StatusRequest, category: StatusCategory, duration_days: Option<u32>, verified: Option<DateTime<Utc>>,
) -> OfficialVisaStatus {
    OfficialVisaStatus {
        passport_country: request.passport.clone(),
        destination_country: request.destination.clone(),
        status_category: category,
        duration_days,
        last_verified: verified.unwrap_or_else(Utc::now),
    }
}

impl PrimaryApiResponse {
    pub fn into_hit(self, request: &StatusRequest) -> Result<SourceHit, SourceError> {
        let category = category(&self.category)?;
        let summary = self.passport_stats.as_ref().and_then(|stats| stats.summary(&request.passport));
        let hit = SourceHit::new(status(request, category, self.duration, self.last_updated));
        Ok(match summary {
            Some(summary) => hit.with_stats_summary(summary),
            None => hit,
        })
    }
}

impl SecondaryApiResponse {
    pub fn into_hit(self, request: &StatusRequest) -> Result<SourceHit, SourceError> {
        let category = category(&self.code)?;
        Ok(SourceHit::new(status(request, category, self.days, self.updated_at)))
    }
}
