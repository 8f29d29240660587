//! MCP tool implementations.
//!
//! This module contains all tools exposed by the visarag server.

pub mod cache;
pub mod visa_requirements;
pub mod visa_status;
pub mod visa_types;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use visarag_client::{RequestOptions, Resolved};
use visarag_core::Error;
use visarag_core::model::VERIFY_THRESHOLD;

/// A resolved artifact plus the notice consumers should display with it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput<T> {
    #[serde(flatten)]
    pub resolved: Resolved<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_notice: Option<String>,
}

impl<T> From<Resolved<T>> for ToolOutput<T> {
    fn from(resolved: Resolved<T>) -> Self {
        let verify_notice = resolved.needs_verification().then(|| {
            format!(
                "Confidence {:.2} ({}) is below {VERIFY_THRESHOLD:.2} or the entry is stale. \
                 Verify with an official government source before travelling.",
                resolved.confidence, resolved.provenance
            )
        });
        Self { resolved, verify_notice }
    }
}

pub(crate) fn options(force_refresh: bool) -> RequestOptions {
    RequestOptions { force_refresh }
}

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::Unavailable(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
