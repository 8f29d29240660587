//! visa_types tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use visarag_client::VisaService;
use visarag_core::VisaQuery;

use super::{ToolOutput, json_result, options};

/// Input parameters for visa_types tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VisaTypesParams {
    /// Destination country (name or ISO code).
    pub country: String,

    /// Passport nationality; narrows the list and grounds the entry status.
    #[serde(default)]
    pub nationality: Option<String>,

    /// Force a refresh, bypassing the cache.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Implementation of the visa_types tool.
pub async fn visa_types_impl(service: &VisaService, params: VisaTypesParams) -> Result<CallToolResult, McpError> {
    let query = VisaQuery { country: params.country, visa_type: None, nationality: params.nationality };
    let resolved = service.visa_types(&query, options(params.force_refresh)).await?;
    json_result(&ToolOutput::from(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{result_json, service};

    #[tokio::test(start_paused = true)]
    async fn test_catalog() {
        let (service, _) = service(true);
        let params = VisaTypesParams { country: "de".into(), nationality: Some("us".into()), force_refresh: false };

        let output = result_json(&visa_types_impl(&service, params).await.unwrap());
        assert_eq!(output["provenance"], "fused_official_and_generated");
        assert_eq!(output["artifact"]["visaTypes"][0]["id"], "tourist");
        assert_eq!(output["artifact"]["groundTruthSource"], "official_scraper");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_grounding_is_ungrounded() {
        let (service, _) = service(true);
        let params = VisaTypesParams { country: "de".into(), nationality: Some("gb".into()), force_refresh: false };

        let output = result_json(&visa_types_impl(&service, params).await.unwrap());
        assert_eq!(output["provenance"], "generated_only");
        assert_eq!(output["artifact"]["groundTruthSource"], "none");
    }
}
