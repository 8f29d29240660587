//! cache_stats tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use visarag_client::VisaService;

use crate::tools::json_result;

/// Implementation of the cache_stats tool.
pub async fn stats_impl(service: &VisaService) -> Result<CallToolResult, McpError> {
    json_result(&service.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{result_json, service};
    use visarag_client::RequestOptions;
    use visarag_core::VisaQuery;

    #[tokio::test(start_paused = true)]
    async fn test_stats_after_hit() {
        let (service, _) = service(true);
        let query = VisaQuery::new("fr").with_visa_type("tourist");
        service.requirements(&query, RequestOptions::default()).await.unwrap();
        service.requirements(&query, RequestOptions::default()).await.unwrap();

        let output = result_json(&stats_impl(&service).await.unwrap());
        assert_eq!(output["requirements"]["hits"], 1);
        assert_eq!(output["requirements"]["misses"], 1);
        assert_eq!(output["requirements"]["itemCount"], 1);
        assert_eq!(output["schedulers"].as_array().unwrap().len(), 2);
    }
}
