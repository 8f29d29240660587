//! visa_status tool implementation.
//!
//! Official entry status only; no generation is involved.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use visarag_client::VisaService;

use super::{ToolOutput, json_result, options};

/// Input parameters for visa_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VisaStatusParams {
    /// Passport country (ISO code, e.g. "US").
    pub passport: String,

    /// Destination country (ISO code, e.g. "JP").
    pub destination: String,

    /// Force a refresh, bypassing the cache.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Implementation of the visa_status tool.
pub async fn status_impl(service: &VisaService, params: VisaStatusParams) -> Result<CallToolResult, McpError> {
    let resolved = service
        .status(&params.passport, &params.destination, options(params.force_refresh))
        .await?;
    json_result(&ToolOutput::from(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{result_json, service};

    #[tokio::test(start_paused = true)]
    async fn test_status_found() {
        let (service, generator) = service(true);
        let params = VisaStatusParams { passport: "US".into(), destination: "JP".into(), force_refresh: false };

        let output = result_json(&status_impl(&service, params).await.unwrap());
        assert_eq!(output["provenance"], "scraped_official");
        assert_eq!(output["artifact"]["status"]["statusCategory"], "visa_free");
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_unavailable() {
        let (service, _) = service(true);
        let params = VisaStatusParams { passport: "gb".into(), destination: "jp".into(), force_refresh: false };

        let err = status_impl(&service, params).await.unwrap_err();
        assert_eq!(err.code.0, -32002);
        assert!(err.message.starts_with("GROUND_TRUTH_UNAVAILABLE"));
    }
}
