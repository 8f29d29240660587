//! Status API request parameters and validation.

use serde::Serialize;
use visarag_core::StatusQuery;

use crate::ground_truth::SourceError;

/// Passport/destination pair as sent to a status API.
///
/// Values are trimmed and uppercased: providers key on ISO codes, and
/// uppercasing country names is harmless for those that accept names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRequest {
    pub passport: String,
    pub destination: String,
}

impl StatusRequest {
    /// # Errors
    ///
    /// Returns `SourceError::InvalidQuery` if either side is blank or contains
    /// characters other than letters, digits, spaces, `-` or `'`.
    pub fn from_query(query: &StatusQuery) -> Result<Self, SourceError> {
        Ok(Self {
            passport: Self::clean("passport", &query.passport)?,
            destination: Self::clean("destination", &query.destination)?,
        })
    }

    fn clean(field: &str, raw: &str) -> Result<String, SourceError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(SourceError::InvalidQuery(format!("{field} cannot be empty")));
        }
        if !value.chars().all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '\'')) {
            return Err(SourceError::InvalidQuery(format!("{field} contains unsupported characters: {value:?}")));
        }
        Ok(value.to_uppercase())
    }

    /// `/status/{passport}/{destination}` with each segment percent-encoded.
    pub fn path(&self) -> String {
        let encode = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>().replace('+', "%20");
        format!("status/{}/{}", encode(&self.passport), encode(&self.destination))
    }
}
