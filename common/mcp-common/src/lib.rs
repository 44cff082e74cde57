//! MCP Common - Shared plumbing for MCP servers
//!
//! - **Startup**: [`init_tracing`] and [`serve_stdio`]
//! - **Results**: [`json_success`] / [`json_error`] for `CallToolResult` responses
//! - **Embeddable**: [`EmbeddableMcp`] for in-process execution
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     mcp_common::init_tracing("my_mcp")?;
//!     mcp_common::serve_stdio(MyServer::new()).await
//! }
//! ```

pub mod embeddable;
pub mod init;
pub mod result;

pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use init::{init_tracing, serve_stdio};
pub use result::{json_error, json_success};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing EmbeddableMcp
pub use async_trait::async_trait;
