//! Request descriptors and validation.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Maximum characters for any query component.
const MAX_FIELD_LEN: usize = 64;

/// A logical request: destination country, optional visa type and nationality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaQuery {
    pub country: String,
    #[serde(default)]
    pub visa_type: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
}

impl VisaQuery {
    pub fn new(country: impl Into<String>) -> Self {
        Self { country: country.into(), ..Default::default() }
    }

    pub fn with_visa_type(mut self, visa_type: impl Into<String>) -> Self {
        self.visa_type = Some(visa_type.into());
        self
    }

    pub fn with_nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = Some(nationality.into());
        self
    }

    /// Validate the query components.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the country is blank, or any component
    /// is blank-but-present or longer than 64 characters.
    pub fn validate(&self) -> Result<(), Error> {
        validate_field("country", Some(&self.country))?;
        validate_field("visa_type", self.visa_type.as_deref())?;
        validate_field("nationality", self.nationality.as_deref())?;
        Ok(())
    }

    /// Visa type, or "any" when unspecified.
    pub fn visa_type_or_any(&self) -> &str {
        self.visa_type.as_deref().map(str::trim).unwrap_or("any")
    }

    /// Status lookup for this query, when a nationality is known.
    pub fn status_query(&self) -> Option<StatusQuery> {
        self.nationality
            .as_deref()
            .map(|passport| StatusQuery::new(passport.trim(), self.country.trim()))
    }
}

fn validate_field(name: &str, value: Option<&str>) -> Result<(), Error> {
    let Some(value) = value else {
        return Ok(());
    };
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{name} cannot be empty")));
    }
    let len = value.trim().chars().count();
    if len > MAX_FIELD_LEN {
        return Err(Error::InvalidInput(format!("{name} too long: {len} chars (max {MAX_FIELD_LEN})")));
    }
    Ok(())
}

/// A passport/destination pair for the ground-truth chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub passport: String,
    pub destination: String,
}

impl StatusQuery {
    pub fn new(passport: impl Into<String>, destination: impl Into<String>) -> Self {
        Self { passport: passport.into(), destination: destination.into() }
    }

    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if either side is blank or too long.
    pub fn validate(&self) -> Result<(), Error> {
        validate_field("passport", Some(&self.passport))?;
        validate_field("destination", Some(&self.destination))?;
        Ok(())
    }
}
