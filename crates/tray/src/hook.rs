//! One-shot clients of the registry: the pre-compaction hook and `status`.
//!
//! Both are silent no-ops when no registry is listening.

use crate::registry::normalize_dir;
use anyhow::{Context, Result};
use lineage_protocol::{
    ancestor_chain, read_message, write_message, ClearFilter, ControlMessage, SessionGroup,
    MAX_ANCESTOR_DEPTH,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::UnixStream;

pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Deserialize)]
struct HookInput {
    #[serde(default)]
    cwd: Option<String>,
}

/// Workspace named by the hook payload's `cwd`, or `fallback` when stdin has none.
pub fn hook_base_dir(stdin: &str, fallback: &Path) -> String {
    let input: HookInput = serde_json::from_str(stdin).unwrap_or_default();
    let raw = input
        .cwd
        .filter(|cwd| !cwd.trim().is_empty())
        .unwrap_or_else(|| fallback.display().to_string());
    normalize_dir(&raw)
}

async fn connect(socket: &Path) -> Option<BufReader<UnixStream>> {
    match UnixStream::connect(socket).await {
        Ok(stream) => Some(BufReader::new(stream)),
        Err(err) => {
            log::debug!("no tray registry at {}: {err}", socket.display());
            None
        }
    }
}

/// Send one request and wait for the first reply `pick` accepts.
async fn exchange<T>(
    socket: &Path,
    request: ControlMessage,
    pick: impl Fn(ControlMessage) -> Option<T>,
) -> Result<Option<T>> {
    let Some(mut stream) = connect(socket).await else {
        return Ok(None);
    };
    write_message(stream.get_mut(), &request)
        .await
        .with_context(|| format!("send {}", request.kind()))?;

    let wait = async {
        loop {
            match read_message(&mut stream).await {
                Ok(Some(message)) => {
                    if let Some(found) = pick(message) {
                        return Ok(Some(found));
                    }
                }
                Ok(None) => return Ok(None),
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(anyhow::Error::new(err).context("read tray reply")),
            }
        }
    };
    match tokio::time::timeout(REPLY_TIMEOUT, wait).await {
        Ok(result) => result,
        Err(_) => {
            log::debug!("tray did not answer {} in time", request.kind());
            Ok(None)
        }
    }
}

/// Ask the registry to clear every session of `client` working in the hook's directory.
///
/// Returns the number of sessions cleared with the normalized directory, or `None` when the
/// registry did not answer.
pub async fn precompact(
    socket: &Path,
    client: &str,
    stdin: &str,
    fallback_dir: &Path,
) -> Result<Option<(usize, String)>> {
    let base_dir = hook_base_dir(stdin, fallback_dir);
    let ancestor_pids = ancestor_chain(MAX_ANCESTOR_DEPTH)
        .into_iter()
        .map(|(pid, _)| pid)
        .collect();
    let filter = ClearFilter {
        base_dir: Some(base_dir.clone()),
        client_name: Some(client.to_string()),
        ancestor_pids: Some(ancestor_pids),
    };

    let cleared = exchange(socket, ControlMessage::ClearByFilter(filter), |reply| {
        match reply {
            ControlMessage::ClearByFilterResult { sessions_cleared } => Some(sessions_cleared),
            _ => None,
        }
    })
    .await?;
    Ok(cleared.map(|count| (count, base_dir)))
}

pub async fn status(socket: &Path) -> Result<Option<Vec<SessionGroup>>> {
    exchange(socket, ControlMessage::List, |reply| match reply {
        ControlMessage::SessionList { groups } => Some(groups),
        _ => None,
    })
    .await
}

pub fn render_groups(groups: &[SessionGroup]) -> String {
    if groups.is_empty() {
        return "No active sessions.".to_string();
    }
    let mut out = Vec::new();
    for group in groups {
        out.push(group.workspace_root.clone());
        for session in &group.sessions {
            let marker = if session.interrupted { "⛔" } else { "✅" };
            let name = session
                .client_label
                .clone()
                .unwrap_or_else(|| format!("PID {}", session.process_id));
            let tool = session
                .last_tool
                .as_deref()
                .map(|tool| format!(" {tool}"))
                .unwrap_or_default();
            out.push(format!(
                "  {marker} {name}{tool}  id={}  files={}",
                session.session_id, session.files_tracked
            ));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{bind_single_instance, serve, Tray};
    use lineage_protocol::{SessionReport, SessionSummary};
    use pretty_assertions::assert_eq;
    use std::time::Instant;
    use tempfile::tempdir;
    use tokio::sync::watch;

    #[test]
    fn base_dir_comes_from_cwd_or_falls_back() {
        let fallback = Path::new("/fallback/dir/");
        assert_eq!(
            hook_base_dir(r#"{"cwd":"/work/project/./src/..","session_id":"x"}"#, fallback),
            "/work/project"
        );
        assert_eq!(hook_base_dir("", fallback), "/fallback/dir");
        assert_eq!(hook_base_dir("{not json", fallback), "/fallback/dir");
        assert_eq!(hook_base_dir(r#"{"cwd":"  "}"#, fallback), "/fallback/dir");
    }

    #[test]
    fn groups_render_one_line_per_session() {
        let groups = vec![SessionGroup {
            workspace_root: "/work".to_string(),
            sessions: vec![SessionSummary {
                session_id: "1_2".to_string(),
                process_id: 1,
                client_label: Some("Claude Code".to_string()),
                files_tracked: 5,
                last_tool: Some("[edit:a.rs]".to_string()),
                interrupted: true,
                started_at_ms: 0,
            }],
        }];
        assert_eq!(
            render_groups(&groups),
            "/work\n  ⛔ Claude Code [edit:a.rs]  id=1_2  files=5"
        );
        assert_eq!(render_groups(&[]), "No active sessions.");
    }

    #[tokio::test]
    async fn absent_registry_is_silent() {
        let dir = tempdir().unwrap();
        let socket = dir.path().join("none.sock");
        assert_eq!(
            precompact(&socket, "claude", "{}", dir.path()).await.unwrap(),
            None
        );
        assert!(status(&socket).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn precompact_clears_sessions_sharing_our_ancestry() {
        let dir = tempdir().unwrap();
        let socket = dir.path().join("tray.sock");
        let listener = bind_single_instance(&socket).await.unwrap().unwrap();
        let tray = Tray::new();
        let (_shutdown, rx) = watch::channel(false);
        tokio::spawn(serve(tray.clone(), listener, socket.clone(), rx));

        // A server spawned by the same client shares this process in its ancestry.
        let (pids, names): (Vec<u32>, Vec<String>) =
            ancestor_chain(MAX_ANCESTOR_DEPTH).into_iter().unzip();
        let mut server = UnixStream::connect(&socket).await.unwrap();
        write_message(
            &mut server,
            &ControlMessage::Register(SessionReport {
                session_id: "s1".to_string(),
                process_id: 9,
                workspace_root: "/work/project".to_string(),
                client_label: None,
                files_tracked: 1,
                last_tool: None,
                first_call: None,
                started_at_ms: 0,
                ancestor_pids: pids,
                ancestor_names: names,
            }),
        )
        .await
        .unwrap();
        let deadline = Instant::now() + REPLY_TIMEOUT;
        while tray.registry().await.is_empty() {
            assert!(Instant::now() < deadline, "registration not seen");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let cleared = precompact(
            &socket,
            "claude",
            r#"{"cwd":"/work/project/"}"#,
            dir.path(),
        )
        .await
        .unwrap();
        assert_eq!(cleared, Some((1, "/work/project".to_string())));

        let mut server = BufReader::new(server);
        let command = tokio::time::timeout(REPLY_TIMEOUT, read_message(&mut server))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(command, Some(ControlMessage::ClearCache));

        let groups = status(&socket).await.unwrap().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].sessions[0].session_id, "s1");
    }
}
