//! visa_requirements tool implementation.
//!
//! Resolves detailed requirements through the cache, grounding and generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use visarag_client::VisaService;
use visarag_core::VisaQuery;

use super::{ToolOutput, json_result, options};

/// Input parameters for visa_requirements tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VisaRequirementsParams {
    /// Destination country (name or ISO code, e.g. "FR").
    pub country: String,

    /// Visa type (e.g. "tourist", "business"). Defaults to any.
    #[serde(default)]
    pub visa_type: Option<String>,

    /// Passport nationality (ISO code, e.g. "US"). Required for grounded results.
    #[serde(default)]
    pub nationality: Option<String>,

    /// Force a refresh, bypassing the cache.
    #[serde(default)]
    pub force_refresh: bool,
}

impl VisaRequirementsParams {
    fn query(&self) -> VisaQuery {
        VisaQuery {
            country: self.country.clone(),
            visa_type: self.visa_type.clone(),
            nationality: self.nationality.clone(),
        }
    }
}

/// Implementation of the visa_requirements tool.
pub async fn requirements_impl(
    service: &VisaService, params: VisaRequirementsParams,
) -> Result<CallToolResult, McpError> {
    let resolved = service.requirements(&params.query(), options(params.force_refresh)).await?;
    json_result(&ToolOutput::from(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{result_json, service};

    #[tokio::test(start_paused = true)]
    async fn test_grounded_requirements() {
        let (service, _) = service(true);
        let params = VisaRequirementsParams {
            country: "JP".into(),
            visa_type: Some("tourist".into()),
            nationality: Some("US".into()),
            force_refresh: false,
        };

        let output = result_json(&requirements_impl(&service, params).await.unwrap());
        assert_eq!(output["provenance"], "fused_official_and_generated");
        assert_eq!(output["origin"], "upstream");
        assert_eq!(output["artifact"]["statusCategory"], "visa_free");
        assert_eq!(output["artifact"]["durationDays"], 90);
        assert!(output.get("verifyNotice").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ungrounded_requirements_carry_notice() {
        let (service, generator) = service(true);
        let params = VisaRequirementsParams { country: "fr".into(), ..Default::default() };

        let output = result_json(&requirements_impl(&service, params.clone()).await.unwrap());
        assert_eq!(output["provenance"], "generated_only");
        assert!(output["verifyNotice"].as_str().unwrap().contains("0.70"));

        let cached = result_json(&requirements_impl(&service, params).await.unwrap());
        assert_eq!(cached["origin"], "cache");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_failure_falls_back() {
        let (service, _) = service(false);
        let params = VisaRequirementsParams {
            country: "br".into(),
            nationality: Some("in".into()),
            ..Default::default()
        };

        let output = result_json(&requirements_impl(&service, params).await.unwrap());
        assert_eq!(output["origin"], "static_fallback");
        assert_eq!(output["confidence"], 0.5);
    }

    #[tokio::test]
    async fn test_empty_country() {
        let (service, _) = service(true);
        let result = requirements_impl(&service, VisaRequirementsParams::default()).await;
        assert!(result.is_err());
    }
}
