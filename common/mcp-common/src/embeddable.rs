//! In-process MCP execution
//!
//! [`EmbeddableMcp`] lets a host call a server's tools directly, without
//! spawning it as a subprocess and talking stdio.
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//!
//! let tools = server.list_tools();
//! let result = server
//!     .call_tool("get_table_schema", serde_json::json!({ "table_name": "sales" }))
//!     .await?;
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("mcp error: {0}")]
    McpError(String),
}

impl From<rmcp::ErrorData> for EmbeddableError {
    fn from(err: rmcp::ErrorData) -> Self {
        EmbeddableError::McpError(err.message.to_string())
    }
}

pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// An MCP server that can be driven in-process
///
/// Servers built on rmcp's `#[tool_router]` implement `list_tools` by
/// delegating to their router. Tool-level failures, an unknown tool name
/// included, come back as `Ok` with an error-flagged result; `Err` is kept
/// for failures of the call machinery itself.
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    /// Name used to identify the server in MCP configuration
    fn server_name(&self) -> &str;

    /// Every tool with its name, description and input schema
    fn list_tools(&self) -> Vec<Tool>;

    /// Run the tool `name` with the JSON object `params`
    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    fn server_description(&self) -> Option<&str> {
        None
    }
}
