//! Official entry status (ground truth).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry classification for a passport/destination pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    VisaFree,
    VisaOnArrival,
    #[serde(rename = "e_visa")]
    EVisa,
    VisaRequired,
    NoAdmission,
}

impl StatusCategory {
    /// Parse the loosely formatted labels used by scraped pages and status APIs.
    ///
    /// Accepts the snake_case serde names, human labels ("visa on arrival"),
    /// and short provider codes (`VF`, `VOA`, `EV`, `VR`, `NA`).
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        let category = match normalized.as_str() {
            "vf" | "visa free" | "visa not required" | "free" | "not required" | "visa exempt" | "exempt" => {
                StatusCategory::VisaFree
            }
            "voa" | "visa on arrival" | "on arrival" | "arrival" => StatusCategory::VisaOnArrival,
            "ev" | "e visa" | "evisa" | "eta" | "electronic visa" | "electronic travel authorization" => {
                StatusCategory::EVisa
            }
            "vr" | "visa required" | "required" => StatusCategory::VisaRequired,
            "na" | "no admission" | "not admitted" | "entry banned" | "banned" => StatusCategory::NoAdmission,
            _ => return Self::find_phrase(&normalized),
        };
        Some(category)
    }

    /// Longer sentences ("visa not required for stays up to 90 days"): look for
    /// a known phrase on word boundaries. Negated forms are checked first.
    fn find_phrase(normalized: &str) -> Option<Self> {
        const PHRASES: &[(&str, StatusCategory)] = &[
            ("no admission", StatusCategory::NoAdmission),
            ("not admitted", StatusCategory::NoAdmission),
            ("entry banned", StatusCategory::NoAdmission),
            ("visa not required", StatusCategory::VisaFree),
            ("visa free", StatusCategory::VisaFree),
            ("visa exempt", StatusCategory::VisaFree),
            ("visa on arrival", StatusCategory::VisaOnArrival),
            ("e visa", StatusCategory::EVisa),
            ("evisa", StatusCategory::EVisa),
            ("electronic travel authorization", StatusCategory::EVisa),
            ("visa required", StatusCategory::VisaRequired),
        ];

        let padded = format!(" {normalized} ");
        PHRASES
            .iter()
            .find(|(phrase, _)| padded.contains(&format!(" {phrase} ")))
            .map(|(_, category)| *category)
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            StatusCategory::VisaFree => "visa free",
            StatusCategory::VisaOnArrival => "visa on arrival",
            StatusCategory::EVisa => "e-visa",
            StatusCategory::VisaRequired => "visa required",
            StatusCategory::NoAdmission => "no admission",
        }
    }
}

/// Authoritative status for a passport holder entering a destination.
///
/// Immutable once fetched: the merger copies it verbatim and never lets
/// generated content contradict it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfficialVisaStatus {
    pub passport_country: String,
    pub destination_country: String,
    pub status_category: StatusCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    pub last_verified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loose_labels() {
        assert_eq!(StatusCategory::parse_loose("Visa Free"), Some(StatusCategory::VisaFree));
        assert_eq!(StatusCategory::parse_loose("visa-free"), Some(StatusCategory::VisaFree));
        assert_eq!(StatusCategory::parse_loose("  VOA "), Some(StatusCategory::VisaOnArrival));
        assert_eq!(StatusCategory::parse_loose("e-Visa"), Some(StatusCategory::EVisa));
        assert_eq!(StatusCategory::parse_loose("eta"), Some(StatusCategory::EVisa));
        assert_eq!(StatusCategory::parse_loose("Visa required"), Some(StatusCategory::VisaRequired));
        assert_eq!(StatusCategory::parse_loose("no_admission"), Some(StatusCategory::NoAdmission));
        assert_eq!(StatusCategory::parse_loose("visa_on_arrival"), Some(StatusCategory::VisaOnArrival));
    }

    #[test]
    fn test_parse_loose_sentences() {
        assert_eq!(
            StatusCategory::parse_loose("Visa not required for stays up to 90 days"),
            Some(StatusCategory::VisaFree)
        );
        assert_eq!(
            StatusCategory::parse_loose("A visa is required: visa required before travel"),
            Some(StatusCategory::VisaRequired)
        );
        assert_eq!(StatusCategory::parse_loose("Apply for an e-Visa online"), Some(StatusCategory::EVisa));
    }

    #[test]
    fn test_parse_loose_unknown() {
        assert_eq!(StatusCategory::parse_loose(""), None);
        assert_eq!(StatusCategory::parse_loose("maybe"), None);
    }

    #[test]
    fn test_serde_roundtrip_names() {
        assert_eq!(serde_json::to_string(&StatusCategory::EVisa).unwrap(), "\"e_visa\"");
        assert_eq!(serde_json::to_string(&StatusCategory::VisaFree).unwrap(), "\"visa_free\"");
    }

    #[test]
    fn test_status_json_shape() {
        let status = OfficialVisaStatus {
            passport_country: "us".into(),
            destination_country: "fr".into(),
            status_category: StatusCategory::VisaFree,
            duration_days: Some(90),
            last_verified: Utc::now(),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["statusCategory"], "visa_free");
        assert_eq!(value["durationDays"], 90);
        assert!(value.get("lastVerified").is_some());
    }
}
