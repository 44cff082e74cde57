//! Tool dispatch
//!
//! [`Dispatcher::dispatch`] never fails: every outcome, including an unknown
//! tool name or a database error, comes back as a [`ToolResult`].

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ToolError;
use crate::session::{ColumnSchema, Row, Session};

/// The closed set of tools this server offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ExecuteSqlQuery,
    GetTableSchema,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::ExecuteSqlQuery, ToolKind::GetTableSchema];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ExecuteSqlQuery => "execute_sql_query",
            ToolKind::GetTableSchema => "get_table_schema",
        }
    }

    /// The single required string parameter of each tool
    pub fn parameter(self) -> &'static str {
        match self {
            ToolKind::ExecuteSqlQuery => "query",
            ToolKind::GetTableSchema => "table_name",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Outcome of a tool call. Serializes as exactly one of
/// `{"results": [...]}`, `{"schema": [...]}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResult {
    Results(Vec<Row>),
    Schema(Vec<ColumnSchema>),
    Error(String),
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }

    pub fn to_value(&self) -> Value {
        match self {
            ToolResult::Results(rows) => json!({ "results": rows }),
            ToolResult::Schema(columns) => json!({ "schema": columns }),
            ToolResult::Error(message) => json!({ "error": message }),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::Error(err.to_string())
    }
}

/// Textual read-only check: does `query` start with `select`?
///
/// Not a parser. `SELECT 1; DROP TABLE sales` passes, so this is no security
/// boundary on its own; the sessions enforce read-only mode server-side.
pub fn is_select_query(query: &str) -> bool {
    query
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

fn required_str<'a>(
    parameters: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, ToolError> {
    parameters
        .get(name)
        .and_then(Value::as_str)
        .ok_or(ToolError::MissingParameter(name))
}

/// Routes tool calls to the owned session
#[derive(Clone)]
pub struct Dispatcher {
    session: Arc<dyn Session>,
}

impl Dispatcher {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }

    pub async fn dispatch(&self, name: &str, parameters: &Map<String, Value>) -> ToolResult {
        let kind = match name.parse::<ToolKind>() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(tool = name, "Rejected call to unknown tool");
                return e.into();
            }
        };

        tracing::debug!(tool = %kind, "Dispatching tool call");

        let value = match required_str(parameters, kind.parameter()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(tool = %kind, error = %e, "Rejected tool call");
                return e.into();
            }
        };

        match kind {
            ToolKind::ExecuteSqlQuery => self.execute_sql_query(value).await,
            ToolKind::GetTableSchema => self.get_table_schema(value).await,
        }
    }

    pub async fn execute_sql_query(&self, query: &str) -> ToolResult {
        match self.run_query(query).await {
            Ok(rows) => {
                tracing::info!(rows = rows.len(), "Query executed");
                ToolResult::Results(rows)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query rejected or failed");
                e.into()
            }
        }
    }

    pub async fn get_table_schema(&self, table_name: &str) -> ToolResult {
        match self.session.table_columns(table_name).await {
            Ok(columns) => {
                tracing::info!(table = table_name, columns = columns.len(), "Schema retrieved");
                ToolResult::Schema(columns)
            }
            Err(e) => {
                let e = ToolError::SchemaRetrieval(e);
                tracing::warn!(table = table_name, error = %e, "Schema retrieval failed");
                e.into()
            }
        }
    }

    async fn run_query(&self, query: &str) -> Result<Vec<Row>, ToolError> {
        if !is_select_query(query) {
            return Err(ToolError::NotSelect);
        }
        self.session
            .fetch_rows(query)
            .await
            .map_err(ToolError::Execution)
    }
}
