//! cache_purge tool implementation.
//!
//! Invalidates one destination country or clears every cache.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use visarag_client::VisaService;
use visarag_core::Error;

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Drop every entry (status, requirements, visa types) for this destination country.
    #[serde(default)]
    pub country: Option<String>,

    /// Clear all caches.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: usize,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(service: &VisaService, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let deleted = match (params.country.as_deref().map(str::trim), params.all) {
        (Some(country), false) if !country.is_empty() => service.invalidate_country(country),
        (None, true) => {
            let stats = service.stats();
            let deleted = stats.status.item_count + stats.requirements.item_count + stats.visa_types.item_count;
            service.clear_all();
            deleted
        }
        _ => {
            return Err(Error::InvalidInput("Specify exactly one of a non-empty country or all=true".into()).into());
        }
    };

    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{result_json, service};
    use visarag_client::RequestOptions;
    use visarag_core::VisaQuery;

    async fn deleted(service: &VisaService, params: CachePurgeParams) -> u64 {
        let output = result_json(&purge_impl(service, params).await.unwrap());
        output["deleted"].as_u64().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_by_country() {
        let (service, _) = service(true);
        let query = VisaQuery::new("jp").with_nationality("us");
        service.requirements(&query, RequestOptions::default()).await.unwrap();
        service.visa_types(&VisaQuery::new("fr"), RequestOptions::default()).await.unwrap();

        let params = CachePurgeParams { country: Some("JP".into()), all: false };
        assert_eq!(deleted(&service, params).await, 2);
        assert_eq!(service.stats().visa_types.item_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_all() {
        let (service, _) = service(true);
        service.visa_types(&VisaQuery::new("fr"), RequestOptions::default()).await.unwrap();
        service.status("us", "it", RequestOptions::default()).await.unwrap();

        assert_eq!(deleted(&service, CachePurgeParams { country: None, all: true }).await, 2);
        assert_eq!(service.stats().status.item_count, 0);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let (service, _) = service(true);
        assert!(purge_impl(&service, CachePurgeParams::default()).await.is_err());

        let both = CachePurgeParams { country: Some("fr".into()), all: true };
        assert!(purge_impl(&service, both).await.is_err());
    }
}
