//! Normalized cache key construction.
//!
//! `domain:country:visa_type:nationality`, each component lowercased and
//! trimmed, with anything outside `[a-z0-9_-]` mapped to `_`. The separator
//! therefore never appears inside a component.

use std::sync::LazyLock;

use regex::Regex;

use crate::query::{StatusQuery, VisaQuery};

const SEPARATOR: char = ':';
const ANY: &str = "any";

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_-]").expect("static regex"));

/// Artifact family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Status,
    Requirements,
    VisaTypes,
}

impl Domain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Domain::Status => "status",
            Domain::Requirements => "requirements",
            Domain::VisaTypes => "visa_types",
        }
    }
}

impl std::str::FromStr for Domain {
    type Err = crate::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_component(raw).as_str() {
            "status" => Ok(Domain::Status),
            "requirements" => Ok(Domain::Requirements),
            "visa_types" | "catalog" => Ok(Domain::VisaTypes),
            other => Err(crate::Error::InvalidInput(format!("unknown cache domain: {other}"))),
        }
    }
}

/// A normalized cache key. Logically identical requests produce byte-identical keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(domain: Domain, country: &str, visa_type: Option<&str>, nationality: Option<&str>) -> Self {
        let key = [
            domain.as_str().to_string(),
            normalize_component(country),
            normalize_component(visa_type.unwrap_or(ANY)),
            normalize_component(nationality.unwrap_or(ANY)),
        ]
        .join(&SEPARATOR.to_string());
        Self(key)
    }

    pub fn requirements(query: &VisaQuery) -> Self {
        Self::new(Domain::Requirements, &query.country, query.visa_type.as_deref(), query.nationality.as_deref())
    }

    /// Catalog keys ignore the visa type: the catalog lists all of them.
    pub fn visa_types(query: &VisaQuery) -> Self {
        Self::new(Domain::VisaTypes, &query.country, None, query.nationality.as_deref())
    }

    pub fn status(query: &StatusQuery) -> Self {
        Self::new(Domain::Status, &query.destination, None, Some(&query.passport))
    }

    /// Re-normalize an already rendered key string. Idempotent.
    pub fn normalize(raw: &str) -> Self {
        let key = raw
            .split(SEPARATOR)
            .map(normalize_component)
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring that matches every key for a destination country.
    pub fn country_pattern(country: &str) -> String {
        format!("{SEPARATOR}{}{SEPARATOR}", normalize_component(country))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase, trim, and replace anything outside `[a-z0-9_-]` with `_`.
pub fn normalize_component(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let component = if lowered.is_empty() { ANY } else { lowered.as_str() };
    DISALLOWED.replace_all(component, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = CacheKey::new(Domain::Requirements, "FR", Some("Tourist"), Some("US"));
        assert_eq!(key.as_str(), "requirements:fr:tourist:us");
    }

    #[test]
    fn test_missing_components_default_to_any() {
        let key = CacheKey::new(Domain::VisaTypes, "Japan", None, None);
        assert_eq!(key.as_str(), "visa_types:japan:any:any");
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let a = CacheKey::requirements(&VisaQuery::new("  France ").with_visa_type("TOURIST").with_nationality("us"));
        let b = CacheKey::requirements(&VisaQuery::new("france").with_visa_type(" tourist").with_nationality(" US "));
        assert_eq!(a, b);
        assert_eq!(a.as_str().as_bytes(), b.as_str().as_bytes());
    }

    #[test]
    fn test_disallowed_characters_mapped() {
        let key = CacheKey::new(Domain::Requirements, "United States", Some("work/permit"), Some("côte d'ivoire"));
        assert_eq!(key.as_str(), "requirements:united_states:work_permit:c_te_d_ivoire");
        assert!(key.as_str().chars().all(|c| c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || matches!(c, ':' | '_' | '-')));
    }

    #[test]
    fn test_separator_inside_component_is_escaped() {
        let key = CacheKey::new(Domain::Requirements, "a:b", None, None);
        assert_eq!(key.as_str(), "requirements:a_b:any:any");
        assert_eq!(key.as_str().split(':').count(), 4);
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = ["Requirements:FR:Tourist:US", "status: jp :any: GB", "visa_types:côte:x y:z", "a::b"];
        for raw in inputs {
            let once = CacheKey::normalize(raw);
            let twice = CacheKey::normalize(once.as_str());
            assert_eq!(once, twice, "normalize not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_normalize_matches_constructor() {
        let built = CacheKey::new(Domain::Requirements, "FR", Some("Tourist"), Some("US"));
        assert_eq!(CacheKey::normalize(built.as_str()), built);
    }

    #[test]
    fn test_status_key_uses_destination_then_passport() {
        let key = CacheKey::status(&StatusQuery::new("US", "FR"));
        assert_eq!(key.as_str(), "status:fr:any:us");
    }

    #[test]
    fn test_catalog_key_ignores_visa_type() {
        let a = CacheKey::visa_types(&VisaQuery::new("fr").with_visa_type("tourist"));
        let b = CacheKey::visa_types(&VisaQuery::new("fr"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_domain_from_str() {
        assert_eq!(" Status ".parse::<Domain>().unwrap(), Domain::Status);
        assert_eq!("catalog".parse::<Domain>().unwrap(), Domain::VisaTypes);
        assert_eq!(Domain::Requirements.as_str().parse::<Domain>().unwrap(), Domain::Requirements);
        assert!("snapshots".parse::<Domain>().is_err());
    }

    #[test]
    fn test_country_pattern() {
        let pattern = CacheKey::country_pattern(" FR ");
        assert_eq!(pattern, ":fr:");
        assert!(CacheKey::status(&StatusQuery::new("us", "fr")).as_str().contains(&pattern));
        assert!(!CacheKey::status(&StatusQuery::new("fr", "us")).as_str().contains(&pattern));
    }
}
