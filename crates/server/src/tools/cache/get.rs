//! cache_get tool implementation.
//!
//! Reads a fresh cache entry without calling any upstream source.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use visarag_client::VisaService;
use visarag_core::VisaQuery;
use visarag_core::cache::Domain;

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Cache domain: "status", "requirements" or "visa_types".
    pub domain: String,

    /// Destination country.
    pub country: String,

    /// Visa type (requirements only).
    #[serde(default)]
    pub visa_type: Option<String>,

    /// Passport nationality (required for status).
    #[serde(default)]
    pub nationality: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(service: &VisaService, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let domain: Domain = params.domain.parse()?;
    let query = VisaQuery { country: params.country, visa_type: params.visa_type, nationality: params.nationality };
    let entry = service.cached(domain, &query)?;
    json_result(&entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{result_json, service};
    use visarag_client::RequestOptions;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (service, _) = service(true);
        let params = CacheGetParams { domain: "requirements".into(), country: "fr".into(), ..Default::default() };

        let err = get_impl(&service, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_impl_found() {
        let (service, generator) = service(true);
        service.status("us", "jp", RequestOptions::default()).await.unwrap();

        let params = CacheGetParams {
            domain: "status".into(),
            country: "JP".into(),
            nationality: Some("US".into()),
            ..Default::default()
        };
        let output = result_json(&get_impl(&service, params).await.unwrap());
        assert_eq!(output["key"], "status:jp:any:us");
        assert_eq!(output["domain"], "status");
        assert_eq!(output["provenance"], "scraped_official");
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_impl_unknown_domain() {
        let (service, _) = service(true);
        let params = CacheGetParams { domain: "snapshots".into(), country: "fr".into(), ..Default::default() };

        let err = get_impl(&service, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
