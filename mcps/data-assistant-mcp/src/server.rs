//! Data assistant MCP server implementation

use mcp_common::{
    async_trait, json_error, json_success, EmbeddableMcp, EmbeddableResult, McpError,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::session::Session;
use crate::tools::{Dispatcher, ToolResult};

const INSTRUCTIONS: &str = "Data analysis MCP server. Use get_table_schema to learn a table's \
    columns, then execute_sql_query to run a read-only SELECT against the database.";

// ============================================================================
// Parameter Types
// ============================================================================

/// Parameters for execute_sql_query tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// The SQL SELECT query to execute
    pub query: String,
}

/// Parameters for get_table_schema tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SchemaParams {
    /// Name of the table
    pub table_name: String,
}

fn to_call_result(result: &ToolResult) -> Result<CallToolResult, McpError> {
    let payload = result.to_value();
    if result.is_error() {
        json_error(&payload)
    } else {
        json_success(&payload)
    }
}

// ============================================================================
// Server Implementation
// ============================================================================

/// Data assistant MCP server
#[derive(Clone)]
pub struct DataAssistantMcpServer {
    dispatcher: Dispatcher,
    tool_router: ToolRouter<Self>,
}

impl DataAssistantMcpServer {
    /// Handle one tool call and return the result mapping.
    ///
    /// Never fails: unknown tools, bad parameters and database errors all come
    /// back as `{"error": "..."}`. Parameters that are not a JSON object are
    /// treated as empty.
    pub async fn handle_tool_call(&self, tool_name: &str, parameters: Value) -> Value {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.dispatcher
            .dispatch(tool_name, &parameters)
            .await
            .to_value()
    }

    /// Tool descriptors, available without a database connection
    pub fn tool_catalog() -> Vec<Tool> {
        Self::tool_router().list_all()
    }
}

#[tool_router]
impl DataAssistantMcpServer {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            dispatcher: Dispatcher::new(session),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Execute a read-only SQL SELECT query on the database")]
    async fn execute_sql_query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result(&self.dispatcher.execute_sql_query(&params.query).await)
    }

    #[tool(description = "Retrieve the schema of a specified database table")]
    async fn get_table_schema(
        &self,
        Parameters(params): Parameters<SchemaParams>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result(&self.dispatcher.get_table_schema(&params.table_name).await)
    }
}

#[tool_handler]
impl rmcp::ServerHandler for DataAssistantMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// EmbeddableMcp Implementation
// ============================================================================

#[async_trait]
impl EmbeddableMcp for DataAssistantMcpServer {
    fn server_name(&self) -> &str {
        "data-assistant"
    }

    fn server_description(&self) -> Option<&str> {
        Some(INSTRUCTIONS)
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        let params: Map<String, Value> = serde_json::from_value(params)?;
        let result = self.dispatcher.dispatch(name, &params).await;
        Ok(to_call_result(&result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SqliteSession;
    use mcp_common::EmbeddableError;
    use rmcp::model::RawContent;
    use serde_json::json;

    fn server() -> DataAssistantMcpServer {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sales (id INTEGER, product TEXT);
             INSERT INTO sales VALUES (1, 'widget');",
        )
        .unwrap();
        DataAssistantMcpServer::new(Arc::new(SqliteSession::new(conn, true).unwrap()))
    }

    fn text_of(result: &CallToolResult) -> Value {
        match &result.content[0].raw {
            RawContent::Text(text) => serde_json::from_str(&text.text).unwrap(),
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_catalog_matches_router() {
        let catalog = DataAssistantMcpServer::tool_catalog();
        let listed = server().list_tools();
        assert_eq!(catalog.len(), listed.len());
        for tool in &catalog {
            assert!(tool.description.is_some());
        }
    }

    #[test]
    fn test_embeddable_server_name() {
        assert_eq!(server().server_name(), "data-assistant");
    }

    #[test]
    fn test_embeddable_list_tools() {
        let tools = server().list_tools();
        assert_eq!(tools.len(), 2);

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert!(names.contains(&"execute_sql_query"));
        assert!(names.contains(&"get_table_schema"));

        let query_tool = tools
            .iter()
            .find(|t| t.name == "execute_sql_query")
            .unwrap();
        let schema = serde_json::to_value(&*query_tool.input_schema).unwrap();
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_handle_tool_call_select() {
        let result = server()
            .handle_tool_call("execute_sql_query", json!({ "query": "SELECT product FROM sales" }))
            .await;
        assert_eq!(result, json!({ "results": [{ "product": "widget" }] }));
    }

    #[tokio::test]
    async fn test_handle_tool_call_non_object_params() {
        let result = server()
            .handle_tool_call("get_table_schema", json!("sales"))
            .await;
        assert_eq!(
            result,
            json!({ "error": "Invalid parameters: missing required string parameter 'table_name'" })
        );
    }

    #[tokio::test]
    async fn test_embeddable_call_schema() {
        let result = server()
            .call_tool("get_table_schema", json!({ "table_name": "sales" }))
            .await
            .unwrap();

        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(
            text_of(&result),
            json!({ "schema": [
                { "column_name": "id", "data_type": "INTEGER" },
                { "column_name": "product", "data_type": "TEXT" }
            ] })
        );
    }

    #[tokio::test]
    async fn test_embeddable_unknown_tool_is_in_band() {
        let result = server()
            .call_tool("nonexistent_tool", json!({}))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            json!({ "error": "Unknown tool: nonexistent_tool" })
        );
    }

    #[tokio::test]
    async fn test_bad_parameter_handling_per_surface() {
        // rmcp deserializes the typed parameters, so over stdio a missing or
        // non-string argument never reaches the dispatcher
        assert!(serde_json::from_value::<QueryParams>(json!({})).is_err());
        assert!(serde_json::from_value::<QueryParams>(json!({ "query": 42 })).is_err());
        assert!(serde_json::from_value::<SchemaParams>(json!({ "table_name": null })).is_err());

        // In-process the same calls are answered in-band
        let result = server()
            .call_tool("execute_sql_query", json!({ "query": 42 }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            json!({ "error": "Invalid parameters: missing required string parameter 'query'" })
        );

        let result = server().handle_tool_call("get_table_schema", json!({})).await;
        assert_eq!(
            result,
            json!({ "error": "Invalid parameters: missing required string parameter 'table_name'" })
        );
    }

    #[tokio::test]
    async fn test_embeddable_rejects_non_object_params() {
        let result = server().call_tool("execute_sql_query", json!([1, 2])).await;
        assert!(matches!(result, Err(EmbeddableError::SerdeError(_))));
    }
}
