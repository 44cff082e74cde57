//! Error types for the data assistant
//!
//! Only [`ConnectionError`] is allowed to escape to the caller. Every
//! per-call failure is a [`ToolError`] and is reported in-band as the
//! `error` field of a [`crate::tools::ToolResult`].

use thiserror::Error;

/// Failure raised by a session backend
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Postgres(#[from] sqlx::Error),

    /// The blocking worker running a SQLite statement panicked or was cancelled
    #[error("database worker failed: {0}")]
    Worker(String),

    #[error("database session is closed")]
    Closed,

    #[error("column \"{column}\" has unsupported type {type_name}; cast it to text in the query")]
    UnsupportedType { column: String, type_name: String },
}

/// Opening a session failed. Fatal at startup.
#[derive(Debug, Error)]
#[error("failed to connect to {target}: {source}")]
pub struct ConnectionError {
    /// Password-free description of what we tried to reach
    pub target: String,
    #[source]
    pub source: DatabaseError,
}

/// Per-call failure, converted into an error payload by the dispatcher
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Only SELECT queries are allowed")]
    NotSelect,

    #[error("Invalid parameters: missing required string parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("Query execution failed: {0}")]
    Execution(#[source] DatabaseError),

    #[error("Schema retrieval failed: {0}")]
    SchemaRetrieval(#[source] DatabaseError),
}
