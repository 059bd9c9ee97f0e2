#![allow(dead_code)]

use anyhow::{Context, Result};
use rmcp::{
    model::{CallToolRequestParam, CallToolResult},
    service::{RoleClient, RunningService, ServiceExt},
    transport::TokioChildProcess,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

pub type Client = RunningService<RoleClient, ()>;

pub fn locate_lineage_mcp_bin() -> Result<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_lineage-mcp") {
        return Ok(PathBuf::from(path));
    }

    // Try to resolve from the current test executable location.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(target_profile_dir) = exe.parent().and_then(|p| p.parent()) {
            let candidate = target_profile_dir.join("lineage-mcp");
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    // Final fallback: search the repo target dirs.
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .ancestors()
        .nth(2)
        .context("failed to resolve repo root from CARGO_MANIFEST_DIR")?;
    for rel in ["target/debug/lineage-mcp", "target/release/lineage-mcp"] {
        let candidate = repo_root.join(rel);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!("failed to locate lineage-mcp binary; build with: cargo build -p lineage-mcp")
}

/// Base directory plus a running client. The base is canonical, like the paths the server prints.
pub struct Harness {
    _tmp: tempfile::TempDir,
    pub base: PathBuf,
    pub client: Client,
}

/// Spawn the server over `base` with the tray disabled and `extra_env` applied.
pub async fn start_service(extra_env: &[(&str, &str)]) -> Result<Harness> {
    let tmp = tempfile::tempdir().context("tempdir")?;
    let base = tmp.path().canonicalize().context("canonicalize tempdir")?;
    let client = spawn_client(&base, extra_env).await?;
    Ok(Harness {
        _tmp: tmp,
        base,
        client,
    })
}

pub async fn spawn_client(base: &Path, extra_env: &[(&str, &str)]) -> Result<Client> {
    let bin = locate_lineage_mcp_bin()?;

    let mut cmd = Command::new(bin);
    cmd.arg(base);
    cmd.env("RUST_LOG", "warn");
    cmd.env("LINEAGE_CONFIG", base.join(".absent-appsettings.json"));
    cmd.env("LINEAGE_DISABLE_TRAY", "1");
    cmd.env_remove("LINEAGE_READ_CHAR_LIMIT");
    cmd.env_remove("LINEAGE_NEW_SESSION_COOLDOWN_SECS");
    cmd.env_remove("LINEAGE_TRAY_SOCKET");
    for (key, value) in extra_env {
        cmd.env(key, value);
    }

    let transport = TokioChildProcess::new(cmd).context("spawn mcp server")?;
    tokio::time::timeout(Duration::from_secs(10), ().serve(transport))
        .await
        .context("timeout starting MCP server")?
        .context("start MCP client")
}

pub async fn call_tool(
    client: &Client,
    name: &str,
    args: serde_json::Value,
) -> Result<CallToolResult> {
    tokio::time::timeout(
        Duration::from_secs(10),
        client.call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        }),
    )
    .await
    .context("timeout calling tool")?
    .context("call tool")
}

pub fn tool_text(result: &CallToolResult) -> Result<&str> {
    result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.as_str())
        .context("tool did not return text output")
}

/// Call a tool that is expected to succeed and return its text.
pub async fn ok_text(client: &Client, name: &str, args: serde_json::Value) -> Result<String> {
    let result = call_tool(client, name, args).await?;
    let text = tool_text(&result)?.to_string();
    anyhow::ensure!(result.is_error != Some(true), "{name} failed: {text}");
    Ok(text)
}

/// Call a tool that is expected to fail and return its text.
pub async fn err_text(client: &Client, name: &str, args: serde_json::Value) -> Result<String> {
    let result = call_tool(client, name, args).await?;
    let text = tool_text(&result)?.to_string();
    anyhow::ensure!(result.is_error == Some(true), "{name} unexpectedly succeeded: {text}");
    Ok(text)
}

/// Make sure the next write lands on a later modification time.
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
