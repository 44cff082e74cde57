//! Data Assistant MCP Server
//!
//! Exposes read-only SQL query and table schema tools over MCP stdio.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use data_assistant_mcp::config::{AssistantConfig, CONFIG_PATH_ENV};
use data_assistant_mcp::{ConnectionManager, DataAssistantMcpServer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "data-assistant-mcp")]
#[command(about = "MCP server exposing read-only SQL query and table schema tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.binks/data-assistant.toml)
    #[arg(long, short, env = CONFIG_PATH_ENV, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (default)
    Serve,
    /// Print the tool catalog as JSON
    Tools,
    /// Call a tool once and print the result
    Call {
        /// Tool name
        tool: String,
        /// Parameters as a JSON object
        #[arg(default_value = "{}")]
        params: String,
    },
}

/// What to do once a database session is open
enum Action {
    Serve,
    Call { tool: String, params: serde_json::Value },
}

/// The action for `command`, or `None` when it needs no database
fn connected_action(command: Commands) -> Result<Option<Action>> {
    match command {
        Commands::Tools => Ok(None),
        Commands::Serve => Ok(Some(Action::Serve)),
        Commands::Call { tool, params } => {
            let params = serde_json::from_str(&params)
                .with_context(|| format!("Parameters are not valid JSON: {}", params))?;
            Ok(Some(Action::Call { tool, params }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    mcp_common::init_tracing("data_assistant_mcp")?;

    let cli = Cli::parse();

    let Some(action) = connected_action(cli.command.unwrap_or(Commands::Serve))? else {
        let catalog = DataAssistantMcpServer::tool_catalog();
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    };

    let config = AssistantConfig::load(cli.config.as_deref())?;

    let manager = ConnectionManager::new();
    let outcome = run(&manager, &config, action).await;
    manager.close().await;
    outcome
}

async fn run(manager: &ConnectionManager, config: &AssistantConfig, action: Action) -> Result<()> {
    let session = manager.connect(&config.database).await?;
    let server = DataAssistantMcpServer::new(session);

    match action {
        Action::Serve => {
            tracing::info!("Starting data_assistant_mcp MCP Server");
            mcp_common::serve_stdio(server).await
        }
        Action::Call { tool, params } => {
            let result = server.handle_tool_call(&tool, params).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
