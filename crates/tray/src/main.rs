//! `lineage-tray`: session registry for `lineage-mcp` servers.
//!
//! ```text
//! lineage-tray serve                  # registry + operator console on stdin
//! lineage-tray precompact <CLIENT>    # hook: clear this client's sessions for the hook's cwd
//! lineage-tray status                 # one-shot listing of registered sessions
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lineage_tray::{console, hook, server};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "lineage-tray")]
#[command(about = "Session registry and operator console for lineage-mcp", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Registry socket (defaults to LINEAGE_TRAY_SOCKET, then the system temp dir)
    #[arg(long, global = true, value_name = "PATH")]
    socket: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the registry and read operator commands from stdin
    Serve,
    /// Pre-compaction hook: reads the hook JSON from stdin and clears matching sessions
    Precompact {
        /// Client name, e.g. "claude-code" or "Visual Studio Code"
        #[arg(value_name = "CLIENT_NAME")]
        client: String,
    },
    /// Print the sessions known to a running registry
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let socket = cli
        .socket
        .unwrap_or_else(lineage_protocol::default_socket_path);

    match cli.command {
        Commands::Serve => run_registry(socket).await,
        Commands::Precompact { client } => {
            let mut input = String::new();
            if let Err(err) = tokio::io::stdin().read_to_string(&mut input).await {
                log::debug!("hook input unreadable: {err}");
            }
            let fallback = std::env::current_dir().unwrap_or_default();
            if let Some((cleared, base_dir)) =
                hook::precompact(&socket, &client, &input, &fallback).await?
            {
                if cleared > 0 {
                    eprintln!("Cleared {cleared} session(s) for {client} in {base_dir}");
                }
            }
            Ok(())
        }
        Commands::Status => {
            match hook::status(&socket).await? {
                Some(groups) => println!("{}", hook::render_groups(&groups)),
                None => println!("lineage-tray is not running at {}", socket.display()),
            }
            Ok(())
        }
    }
}

async fn run_registry(socket: PathBuf) -> Result<()> {
    let Some(listener) = server::bind_single_instance(&socket).await? else {
        log::warn!(
            "another lineage-tray is already listening on {}",
            socket.display()
        );
        return Ok(());
    };
    log::info!("lineage-tray listening on {}", socket.display());

    let tray = server::Tray::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let accept = tokio::spawn(server::serve(
        tray.clone(),
        listener,
        socket,
        shutdown_rx,
    ));

    let quit = tokio::select! {
        res = console::run(tray) => res?,
        _ = tokio::signal::ctrl_c() => true,
    };
    if !quit {
        log::info!("console input closed, serving until interrupted");
        tokio::signal::ctrl_c()
            .await
            .context("wait for interrupt")?;
    }
    log::info!("shutting down");

    let _ = shutdown_tx.send(true);
    accept.await.context("registry task panicked")?
}
