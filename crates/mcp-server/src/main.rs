//! Lineage MCP Server
//!
//! Serves files from one base directory to AI agents over MCP and keeps track of what each agent
//! has seen, so responses can point out files that changed on disk since they were read and
//! append the instruction files (`AGENTS.md`) of the folders being worked in.
//!
//! ## Tools
//!
//! - `list` / `search` - directory table and glob search
//! - `read` / `multi_read` - numbered, paged file content
//! - `write` / `edit` / `multi_edit` / `delete` - file changes
//! - `clear` - forget the session cache
//!
//! ## Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "lineage": {
//!       "command": "lineage-mcp",
//!       "args": ["/path/to/project"]
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use lineage_session::{LineageConfig, PathGuard, SharedSession};
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::path::PathBuf;

mod control;
mod tools;

use control::{ControlHandle, ControlOptions};
use tools::LineageService;

#[derive(Parser)]
#[command(name = "lineage-mcp")]
#[command(about = "MCP file server with change tracking for AI agents", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory every tool path is resolved against and confined to
    #[arg(value_name = "BASE_DIR", default_value = "/data")]
    base_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure logging to stderr only (stdout is for MCP protocol)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = LineageConfig::load();
    let guard = PathGuard::new(&cli.base_dir)
        .with_context(|| format!("invalid base directory {}", cli.base_dir.display()))?;

    log::info!("Starting Lineage MCP server in {}", guard.base().display());

    let session = SharedSession::new(config.clone());
    let control = if config.disable_tray {
        None
    } else {
        let socket_path = config
            .tray_socket
            .clone()
            .unwrap_or_else(lineage_protocol::default_socket_path);
        Some(ControlHandle::spawn(
            session.clone(),
            ControlOptions {
                socket_path,
                workspace_root: guard.base().display().to_string(),
                reconnect_interval: config.tray_reconnect_interval(),
            },
        ))
    };

    let service = LineageService::new(guard, session, control.clone());
    let server = service.serve(stdio()).await?;

    // Wait for shutdown
    server.waiting().await?;

    if let Some(control) = control {
        control.shutdown().await;
    }
    log::info!("Lineage MCP server stopped");
    Ok(())
}
