//! Database sessions
//!
//! A [`Session`] is the one live connection the server owns. The dispatcher
//! only ever sees `Arc<dyn Session>`, so tests can swap in a double and the
//! backends stay interchangeable.

pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DatabaseError;

pub use postgres::PostgresSession;
pub use sqlite::SqliteSession;

/// One result row: column name to value, in column order
pub type Row = Map<String, Value>;

/// Column name and declared type as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub column_name: String,
    pub data_type: String,
}

#[async_trait]
pub trait Session: Send + Sync {
    /// Backend name for logs
    fn backend(&self) -> &'static str;

    /// Run `sql` verbatim and collect every row
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, DatabaseError>;

    /// Look up the columns of `table_name` in the catalog.
    ///
    /// An unknown table yields an empty list, not an error.
    async fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, DatabaseError>;

    /// Release the underlying connection. Calling it again is a no-op.
    async fn close(&self) -> Result<(), DatabaseError>;
}
