//! cache_optimize tool implementation.
//!
//! Runs one maintenance cycle on demand, outside the background schedule.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use visarag_client::BackgroundOptimizer;

use crate::tools::json_result;

/// Implementation of the cache_optimize tool.
pub async fn optimize_impl(optimizer: &BackgroundOptimizer) -> Result<CallToolResult, McpError> {
    json_result(&optimizer.perform_optimization())
}
