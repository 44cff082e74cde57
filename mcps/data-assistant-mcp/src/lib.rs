//! Data Assistant MCP Library
//!
//! Two database tools for a natural-language caller: `execute_sql_query`
//! (read-only SELECT) and `get_table_schema` (catalog lookup). Backed by
//! PostgreSQL or SQLite.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use data_assistant_mcp::{config::AssistantConfig, ConnectionManager, DataAssistantMcpServer};
//!
//! let config = AssistantConfig::load(None)?;
//! let manager = ConnectionManager::new();
//! let session = manager.connect(&config.database).await?;
//!
//! let server = DataAssistantMcpServer::new(session);
//! let result = server
//!     .handle_tool_call("get_table_schema", serde_json::json!({ "table_name": "sales" }))
//!     .await;
//!
//! manager.close().await;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod server;
pub mod session;
pub mod tools;

// Re-export main types
pub use connection::ConnectionManager;
pub use error::{ConnectionError, DatabaseError, ToolError};
pub use server::DataAssistantMcpServer;
pub use tools::{Dispatcher, ToolKind, ToolResult};

// Re-export parameter types for direct API usage
pub use server::{QueryParams, SchemaParams};
