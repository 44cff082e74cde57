//! Result helpers for MCP tool responses
//!
//! Tools report their outcome as JSON text content. Failures that belong to
//! the tool (bad input, a query that errored) are still a normal response,
//! just flagged with `is_error`, so the client sees the message instead of a
//! protocol error.

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

fn to_json<T: Serialize>(data: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(data).map_err(|e| McpError::internal_error(e.to_string(), None))
}

/// Successful response carrying `data` as pretty-printed JSON
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(to_json(data)?)]))
}

/// Tool-level failure carrying `data` as pretty-printed JSON
///
/// ```rust,ignore
/// use mcp_common::json_error;
///
/// json_error(&serde_json::json!({ "error": "Only SELECT queries are allowed" }))
/// ```
pub fn json_error<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(to_json(data)?)]))
}
