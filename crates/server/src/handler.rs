//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    cache::{CacheGetParams, CachePurgeParams, get_impl, optimize_impl, purge_impl, stats_impl},
    visa_requirements::{VisaRequirementsParams, requirements_impl},
    visa_status::{VisaStatusParams, status_impl},
    visa_types::{VisaTypesParams, visa_types_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use visarag_client::{BackgroundOptimizer, VisaService};

/// The main MCP server handler for visarag.
#[derive(Clone)]
pub struct VisaRagServer {
    service: VisaService,
    optimizer: BackgroundOptimizer,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl VisaRagServer {
    pub fn new(service: VisaService, optimizer: BackgroundOptimizer) -> Self {
        Self { service, optimizer, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Visa requirements for a destination, optionally for a visa type and nationality. Grounded in official entry-status data when a nationality is given. Every result carries provenance and confidence."
    )]
    async fn visa_requirements(&self, params: Parameters<VisaRequirementsParams>) -> Result<CallToolResult, McpError> {
        requirements_impl(&self.service, params.0).await
    }

    #[tool(description = "Visa types available at a destination, optionally for one nationality.")]
    async fn visa_types(&self, params: Parameters<VisaTypesParams>) -> Result<CallToolResult, McpError> {
        visa_types_impl(&self.service, params.0).await
    }

    #[tool(description = "Official entry status (visa free, visa on arrival, e-visa, visa required) for a passport at a destination.")]
    async fn visa_status(&self, params: Parameters<VisaStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.service, params.0).await
    }

    /// Read-only cache lookup. Never calls upstream.
    #[tool(description = "Read a cached artifact (status, requirements or visa_types) without calling any upstream source.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.service, params.0).await
    }

    #[tool(description = "Cache hit rates, item counts and per-dependency scheduler counters.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.service).await
    }

    #[tool(description = "Invalidate cached entries for one destination country, or clear every cache.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.service, params.0).await
    }

    #[tool(description = "Run one optimization cycle now: purge expired entries and report cache health.")]
    async fn cache_optimize(&self) -> Result<CallToolResult, McpError> {
        optimize_impl(&self.optimizer).await
    }
}

impl ServerHandler for VisaRagServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "visarag".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Visa requirements fused from official entry-status sources and generated content. \
                 Results below 0.8 confidence should be verified with an official source."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tool_surface() {
        let service = VisaService::builder().build();
        let optimizer = BackgroundOptimizer::new(service.maintenance_targets(), Duration::from_secs(3_600), 0.75);
        let server = VisaRagServer::new(service, optimizer);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_optimize",
                "cache_purge",
                "cache_stats",
                "visa_requirements",
                "visa_status",
                "visa_types"
            ]
        );
        assert_eq!(server.get_info().server_info.name, "visarag");
    }
}
