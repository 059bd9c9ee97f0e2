//! Operator console on the stdin of `lineage-tray serve`.

use crate::registry::Registry;
use crate::server::Tray;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const LOG_LINES: usize = 20;

const HELP: &str = "\
Commands:
  sessions            list connected sessions by workspace root
  clear <id>          clear one session's cache
  interrupt <id>      pause a session's file tools
  resume <id>         let a paused session continue
  clear-root <root>   clear every session serving <root>
  log                 show recent control messages
  help                show this text
  quit                stop the registry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sessions,
    Clear(String),
    Interrupt(String),
    Resume(String),
    ClearRoot(String),
    Log,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));
        let argument = |name: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };
        match word {
            "sessions" | "ls" => Ok(Command::Sessions),
            "clear" => argument("clear").map(Command::Clear),
            "interrupt" => argument("interrupt").map(Command::Interrupt),
            "resume" => argument("resume").map(Command::Resume),
            "clear-root" => argument("clear-root").map(Command::ClearRoot),
            "log" => Ok(Command::Log),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Read commands until `quit` (returns true) or end of input (returns false).
pub async fn run(tray: Arc<Tray>) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read console input")? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => return Ok(true),
            Ok(command) => println!("{}", execute(&tray, &command).await),
            Err(err) => println!("{err}"),
        }
    }
    Ok(false)
}

pub async fn execute(tray: &Tray, command: &Command) -> String {
    match command {
        Command::Sessions => render_sessions(&*tray.registry().await),
        Command::Clear(id) => outcome(tray.clear(id).await, "clear_cache", id),
        Command::Interrupt(id) => outcome(tray.interrupt(id).await, "interrupt", id),
        Command::Resume(id) => outcome(tray.resume(id).await, "resume", id),
        Command::ClearRoot(root) => {
            let (sent, matched) = tray.clear_root(root).await;
            format!("Sent clear_cache to {sent} of {matched} session(s) in {root}")
        }
        Command::Log => {
            let lines = tray.recent_log(LOG_LINES).await;
            if lines.is_empty() {
                "Message log is empty.".to_string()
            } else {
                lines.join("\n")
            }
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

fn outcome(sent: bool, kind: &str, id: &str) -> String {
    if sent {
        format!("Sent {kind} to {id}")
    } else {
        format!("Session {id} is not connected")
    }
}

pub fn render_sessions(registry: &Registry) -> String {
    if registry.is_empty() {
        return "No active sessions.".to_string();
    }
    let mut out = Vec::new();
    for (root, records) in registry.grouped() {
        out.push(format!("{root} ({})", records.len()));
        for record in records {
            let since = record
                .started_at()
                .map(|at| format!("  since {}", at.format("%I:%M %p")))
                .unwrap_or_default();
            out.push(format!(
                "  {}  id={}  files={}{since}",
                record.display_name(),
                record.session_id,
                record.files_tracked
            ));
            out.push(format!("      {}", record.ancestor_chain()));
        }
    }
    let compactions: Vec<String> = registry
        .compactions()
        .map(|event| format!("  {}", event.render()))
        .collect();
    if !compactions.is_empty() {
        out.push("Compactions:".to_string());
        out.extend(compactions);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_protocol::SessionReport;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!("sessions".parse::<Command>(), Ok(Command::Sessions));
        assert_eq!(
            "  clear  123_456 ".parse::<Command>(),
            Ok(Command::Clear("123_456".to_string()))
        );
        assert_eq!(
            "clear-root /work/my project".parse::<Command>(),
            Ok(Command::ClearRoot("/work/my project".to_string()))
        );
        assert_eq!(
            "resume".parse::<Command>(),
            Err(CommandError::MissingArgument("resume"))
        );
        assert_eq!(
            "reboot now".parse::<Command>().unwrap_err().to_string(),
            "unknown command `reboot` (try `help`)"
        );
    }

    #[test]
    fn renders_sessions_grouped_by_root() {
        let mut registry = Registry::new();
        assert_eq!(render_sessions(&registry), "No active sessions.");

        registry.upsert(SessionReport {
            session_id: "42_1".to_string(),
            process_id: 42,
            workspace_root: "/work".to_string(),
            client_label: None,
            files_tracked: 3,
            last_tool: Some("[read:a.txt]".to_string()),
            first_call: None,
            started_at_ms: 0,
            ancestor_pids: Vec::new(),
            ancestor_names: Vec::new(),
        });
        let text = render_sessions(&registry);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "/work (1)");
        assert!(
            lines[1].starts_with("  ✅ PID 42 [read:a.txt]  id=42_1  files=3"),
            "{text}"
        );
        assert_eq!(lines[2], "      PID 42 (no chain)");
    }

    #[tokio::test]
    async fn commands_for_unknown_sessions_report_it() {
        let tray = Tray::new();
        assert_eq!(
            execute(&tray, &Command::Clear("nope".to_string())).await,
            "Session nope is not connected"
        );
        assert_eq!(
            execute(&tray, &Command::ClearRoot("/work".to_string())).await,
            "Sent clear_cache to 0 of 0 session(s) in /work"
        );
        assert_eq!(execute(&tray, &Command::Log).await, "Message log is empty.");
    }
}
