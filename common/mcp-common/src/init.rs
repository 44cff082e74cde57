//! Server startup
//!
//! Tracing setup and the stdio serve loop shared by MCP server binaries.

use rmcp::{transport::stdio, ServerHandler, ServiceExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for an MCP server
///
/// Logs go to stderr because stdout carries the MCP protocol. Filtering
/// follows `RUST_LOG`, with `<crate_name>=info` added on top and sqlx's
/// per-statement logging held at `warn` so query text does not flood the log.
///
/// Set `LOG_FORMAT=json` for JSON lines instead of plain text.
pub fn init_tracing(crate_name: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}=info", crate_name).parse()?)
        .add_directive("sqlx=warn".parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

/// Serve `server` over stdio until the client disconnects
///
/// Returns once the transport closes, so callers can release resources
/// afterwards whether the session ended cleanly or not.
pub async fn serve_stdio<S: ServerHandler>(server: S) -> anyhow::Result<()> {
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running, waiting for requests...");

    let reason = service.waiting().await?;

    tracing::info!(?reason, "Server shutting down");
    Ok(())
}
