//! # Lineage control protocol
//!
//! Messages exchanged between a serving `lineage-mcp` process and the `lineage-tray`
//! supervisor. One JSON object per line over a Unix domain socket; the `type` field selects the
//! message kind and payload fields are camelCase.
//!
//! ```text
//! lineage-mcp ──register/update/unregister──▶ lineage-tray
//! lineage-mcp ◀──clear_cache/interrupt/resume── lineage-tray
//! hook/status ──clear_by_filter/list──▶ lineage-tray ──result──▶ hook/status
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod framing;
pub mod process;

pub use framing::{read_line_limited, read_message, write_message, MAX_LINE_BYTES};
pub use process::{ancestor_chain, MAX_ANCESTOR_DEPTH};

pub const SOCKET_FILE_NAME: &str = "lineage-mcp-tray.sock";
pub const SOCKET_ENV: &str = "LINEAGE_TRAY_SOCKET";

/// PIDs that never count as a shared ancestor (idle/system processes).
pub const SYSTEM_PIDS: &[u32] = &[0, 4];

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message exceeds {0} bytes")]
    LineTooLong(usize),
}

impl ProtocolError {
    /// A malformed line poisons only itself; the stream stays usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProtocolError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Session summary pushed by a serving process on `register` and on every `update`.
///
/// Optional fields that are absent in an `update` keep their previously reported value on the
/// registry side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    pub process_id: u32,
    pub workspace_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_label: Option<String>,
    #[serde(default)]
    pub files_tracked: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_call: Option<String>,
    #[serde(default)]
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestor_pids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestor_names: Vec<String>,
}

/// Selector used by pre-compaction hooks to clear every matching session at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestor_pids: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub process_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_label: Option<String>,
    pub files_tracked: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tool: Option<String>,
    pub interrupted: bool,
    pub started_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGroup {
    pub workspace_root: String,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    // serving process -> registry
    Register(SessionReport),
    Update(SessionReport),
    Unregister {
        #[serde(rename = "sessionId")]
        session_id: String,
    },

    // registry -> serving process
    ClearCache,
    Interrupt,
    Resume,

    // one-shot clients <-> registry
    ClearByFilter(ClearFilter),
    ClearByFilterResult {
        #[serde(rename = "sessionsCleared")]
        sessions_cleared: usize,
    },
    List,
    SessionList {
        groups: Vec<SessionGroup>,
    },

    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::Register(_) => "register",
            ControlMessage::Update(_) => "update",
            ControlMessage::Unregister { .. } => "unregister",
            ControlMessage::ClearCache => "clear_cache",
            ControlMessage::Interrupt => "interrupt",
            ControlMessage::Resume => "resume",
            ControlMessage::ClearByFilter(_) => "clear_by_filter",
            ControlMessage::ClearByFilterResult { .. } => "clear_by_filter_result",
            ControlMessage::List => "list",
            ControlMessage::SessionList { .. } => "session_list",
            ControlMessage::Unknown => "unknown",
        }
    }
}

/// Registry endpoint: `LINEAGE_TRAY_SOCKET` when set, otherwise a well-known file in the
/// system temp directory.
pub fn default_socket_path() -> PathBuf {
    if let Some(raw) = std::env::var_os(SOCKET_ENV) {
        if !raw.is_empty() {
            return PathBuf::from(raw);
        }
    }
    std::env::temp_dir().join(SOCKET_FILE_NAME)
}

/// True when the two chains share a non-system PID.
pub fn ancestor_chains_overlap(a: &[u32], b: &[u32]) -> bool {
    a.iter()
        .filter(|pid| !SYSTEM_PIDS.contains(pid))
        .any(|pid| b.contains(pid))
}
