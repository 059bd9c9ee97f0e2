//! In-memory view of every connected `lineage-mcp` session.
//!
//! Pure bookkeeping: no sockets here. The connection side lives in [`crate::server`].

use chrono::{DateTime, Local, TimeZone};
use lineage_protocol::{
    ancestor_chains_overlap, ClearFilter, SessionGroup, SessionReport, SessionSummary,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Component, Path, PathBuf};

/// Ancestor process name (lowercase) to the client it belongs to.
const CLIENT_PROCESSES: &[(&str, &str)] = &[
    ("code", "Visual Studio Code"),
    ("code.exe", "Visual Studio Code"),
    ("opencode", "opencode"),
    ("opencode.exe", "opencode"),
    ("claude", "Claude Code"),
    ("claude.exe", "Claude Code"),
];

const MAX_COMPACTIONS: usize = 50;

/// First known client among `ancestor_names`, nearest ancestor first.
pub fn infer_client(ancestor_names: &[String]) -> Option<String> {
    ancestor_names.iter().find_map(|name| {
        let lower = name.to_lowercase();
        CLIENT_PROCESSES
            .iter()
            .find(|(process, _)| *process == lower)
            .map(|(_, client)| (*client).to_string())
    })
}

/// Lexical normalization of a directory: no `.` segments, `..` folded, no trailing separator.
pub fn normalize_dir(raw: &str) -> String {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return ".".to_string();
    }
    parts.iter().collect::<PathBuf>().display().to_string()
}

fn same_dir(a: &str, b: &str) -> bool {
    normalize_dir(a).to_lowercase() == normalize_dir(b).to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub process_id: u32,
    pub workspace_root: String,
    pub client_label: Option<String>,
    pub files_tracked: usize,
    pub first_call: Option<String>,
    pub last_tool: Option<String>,
    pub started_at_ms: u64,
    pub ancestor_pids: Vec<u32>,
    pub ancestor_names: Vec<String>,
    pub interrupted: bool,
}

impl SessionRecord {
    fn from_report(report: SessionReport) -> Self {
        let client_label = report
            .client_label
            .or_else(|| infer_client(&report.ancestor_names));
        Self {
            session_id: report.session_id,
            process_id: report.process_id,
            workspace_root: report.workspace_root,
            client_label,
            files_tracked: report.files_tracked,
            first_call: report.first_call,
            last_tool: report.last_tool,
            started_at_ms: report.started_at_ms,
            ancestor_pids: report.ancestor_pids,
            ancestor_names: report.ancestor_names,
            interrupted: false,
        }
    }

    /// Fields absent from `report` keep their previous value.
    fn merge(&mut self, report: SessionReport) {
        self.process_id = report.process_id;
        self.workspace_root = report.workspace_root;
        self.files_tracked = report.files_tracked;
        if report.client_label.is_some() {
            self.client_label = report.client_label;
        }
        if report.first_call.is_some() {
            self.first_call = report.first_call;
        }
        if report.last_tool.is_some() {
            self.last_tool = report.last_tool;
        }
        if report.started_at_ms != 0 {
            self.started_at_ms = report.started_at_ms;
        }
        if !report.ancestor_pids.is_empty() {
            self.ancestor_pids = report.ancestor_pids;
            self.ancestor_names = report.ancestor_names;
        }
        if self.client_label.is_none() {
            self.client_label = infer_client(&self.ancestor_names);
        }
    }

    /// `✅ Claude Code [read:src/main.rs]`, or `⛔ PID 42` while interrupted.
    pub fn display_name(&self) -> String {
        let marker = if self.interrupted { "⛔" } else { "✅" };
        let mut name = match &self.client_label {
            Some(label) => format!("{marker} {label}"),
            None => format!("{marker} PID {}", self.process_id),
        };
        if let Some(tool) = self.last_tool.as_ref().or(self.first_call.as_ref()) {
            name.push(' ');
            name.push_str(tool);
        }
        name
    }

    /// `lineage-mcp(30) → bash(20) → code(10)`.
    pub fn ancestor_chain(&self) -> String {
        if self.ancestor_pids.is_empty() {
            return format!("PID {} (no chain)", self.process_id);
        }
        self.ancestor_pids
            .iter()
            .enumerate()
            .map(|(idx, pid)| {
                let name = self.ancestor_names.get(idx).map_or("?", String::as_str);
                format!("{name}({pid})")
            })
            .collect::<Vec<_>>()
            .join(" → ")
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        let millis = i64::try_from(self.started_at_ms).ok()?;
        Local.timestamp_millis_opt(millis).single()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            process_id: self.process_id,
            client_label: self.client_label.clone(),
            files_tracked: self.files_tracked,
            last_tool: self.last_tool.clone(),
            interrupted: self.interrupted,
            started_at_ms: self.started_at_ms,
        }
    }
}

/// A pre-compaction clear that reached one session.
#[derive(Debug, Clone)]
pub struct CompactionEvent {
    pub at: DateTime<Local>,
    pub session_id: String,
    pub client_label: Option<String>,
    pub workspace_root: String,
    pub files_tracked: usize,
}

impl CompactionEvent {
    pub fn render(&self) -> String {
        format!(
            "[{}] {}: {} files in {}",
            self.at.format("%H:%M:%S"),
            self.client_label.as_deref().unwrap_or("unknown"),
            self.files_tracked,
            self.workspace_root
        )
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<String, SessionRecord>,
    compactions: VecDeque<CompactionEvent>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a `register`/`update`. Returns true for a session seen for the first time.
    pub fn upsert(&mut self, report: SessionReport) -> bool {
        match self.sessions.get_mut(&report.session_id) {
            Some(existing) => {
                existing.merge(report);
                false
            }
            None => {
                let record = SessionRecord::from_report(report);
                self.sessions.insert(record.session_id.clone(), record);
                true
            }
        }
    }

    pub fn remove(&mut self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.remove(session_id)
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionRecord> {
        self.sessions.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Mirror of the last interrupt/resume the operator sent.
    pub fn set_interrupted(&mut self, session_id: &str, interrupted: bool) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(record) => {
                record.interrupted = interrupted;
                true
            }
            None => false,
        }
    }

    /// Sessions grouped by workspace root; roots sorted, sessions oldest first.
    pub fn grouped(&self) -> Vec<(String, Vec<&SessionRecord>)> {
        let mut groups: BTreeMap<&str, Vec<&SessionRecord>> = BTreeMap::new();
        for record in self.sessions.values() {
            groups
                .entry(record.workspace_root.as_str())
                .or_default()
                .push(record);
        }
        groups
            .into_iter()
            .map(|(root, mut records)| {
                records.sort_by(|a, b| {
                    a.started_at_ms
                        .cmp(&b.started_at_ms)
                        .then_with(|| a.session_id.cmp(&b.session_id))
                });
                (root.to_string(), records)
            })
            .collect()
    }

    pub fn groups(&self) -> Vec<SessionGroup> {
        self.grouped()
            .into_iter()
            .map(|(workspace_root, records)| SessionGroup {
                workspace_root,
                sessions: records.into_iter().map(SessionRecord::summary).collect(),
            })
            .collect()
    }

    /// Ids of every session serving `root` (normalized, case-insensitive).
    pub fn ids_for_root(&self, root: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .values()
            .filter(|record| same_dir(&record.workspace_root, root))
            .map(|record| record.session_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Sessions a pre-compaction hook should clear.
    ///
    /// The base dir must match. Then, when both sides know their ancestors, the chains must share
    /// a non-system PID; otherwise the client names are compared as a case-insensitive substring.
    pub fn find_by_filter(&self, filter: &ClearFilter) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .values()
            .filter(|record| {
                if let Some(base_dir) = &filter.base_dir {
                    if !same_dir(&record.workspace_root, base_dir) {
                        return false;
                    }
                }
                match (&filter.ancestor_pids, &filter.client_name, &record.client_label) {
                    (Some(pids), _, _) if !record.ancestor_pids.is_empty() => {
                        ancestor_chains_overlap(pids, &record.ancestor_pids)
                    }
                    (_, Some(wanted), Some(label)) => {
                        label.to_lowercase().contains(&wanted.to_lowercase())
                    }
                    _ => true,
                }
            })
            .map(|record| record.session_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn record_compaction(&mut self, session_id: &str) {
        let Some(record) = self.sessions.get(session_id) else {
            return;
        };
        if self.compactions.len() == MAX_COMPACTIONS {
            self.compactions.pop_front();
        }
        self.compactions.push_back(CompactionEvent {
            at: Local::now(),
            session_id: record.session_id.clone(),
            client_label: record.client_label.clone(),
            workspace_root: record.workspace_root.clone(),
            files_tracked: record.files_tracked,
        });
    }

    /// Oldest first.
    pub fn compactions(&self) -> impl Iterator<Item = &CompactionEvent> {
        self.compactions.iter()
    }
}
