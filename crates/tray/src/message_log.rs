use chrono::{DateTime, Local};
use lineage_protocol::ControlMessage;
use serde_json::Value;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 100;
const MAX_VALUE_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From a serving process or a one-shot client.
    Received,
    Sent,
}

impl Direction {
    fn arrow(self) -> &'static str {
        match self {
            Direction::Received => "←",
            Direction::Sent => "→",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub direction: Direction,
    pub peer: String,
    pub message: ControlMessage,
}

impl LogEntry {
    /// `[12:34:05] ← 4242_1700000000: update (filesTracked=3, lastTool=[list])`
    pub fn render(&self) -> String {
        let fields = match serde_json::to_value(&self.message) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .filter(|(key, _)| key != "type" && key != "sessionId")
                .map(|(key, value)| format!("{key}={}", compact(&value)))
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        let body = if fields.is_empty() {
            self.message.kind().to_string()
        } else {
            format!("{} ({})", self.message.kind(), fields.join(", "))
        };
        format!(
            "[{}] {} {}: {body}",
            self.at.format("%H:%M:%S"),
            self.direction.arrow(),
            self.peer
        )
    }
}

fn compact(value: &Value) -> String {
    let text = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if text.chars().count() <= MAX_VALUE_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_VALUE_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

/// Bounded history of control traffic; the oldest entry goes first.
#[derive(Debug)]
pub struct MessageLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, direction: Direction, peer: &str, message: &ControlMessage) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at: Local::now(),
            direction,
            peer: peer.to_string(),
            message: message.clone(),
        });
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lineage_protocol::SessionReport;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_only_the_newest_entries() {
        let mut log = MessageLog::new(3);
        for _ in 0..2 {
            log.record(Direction::Sent, "s1", &ControlMessage::ClearCache);
        }
        for _ in 0..2 {
            log.record(Direction::Sent, "s1", &ControlMessage::Interrupt);
        }
        assert_eq!(log.len(), 3);
        let kinds: Vec<_> = log.recent(10).map(|entry| entry.message.kind()).collect();
        assert_eq!(kinds, vec!["clear_cache", "interrupt", "interrupt"]);
        let last: Vec<_> = log.recent(1).map(|entry| entry.message.kind()).collect();
        assert_eq!(last, vec!["interrupt"]);
    }

    #[test]
    fn renders_direction_and_compact_fields() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 34, 5).single().unwrap();
        let sent = LogEntry {
            at,
            direction: Direction::Sent,
            peer: "s1".to_string(),
            message: ControlMessage::ClearCache,
        };
        assert_eq!(sent.render(), "[12:34:05] → s1: clear_cache");

        let received = LogEntry {
            at,
            direction: Direction::Received,
            peer: "s1".to_string(),
            message: ControlMessage::Update(SessionReport {
                session_id: "s1".to_string(),
                process_id: 7,
                workspace_root: format!("/{}", "x".repeat(60)),
                client_label: None,
                files_tracked: 2,
                last_tool: None,
                first_call: None,
                started_at_ms: 0,
                ancestor_pids: Vec::new(),
                ancestor_names: Vec::new(),
            }),
        };
        let rendered = received.render();
        assert!(rendered.starts_with("[12:34:05] ← s1: update ("), "{rendered}");
        assert!(rendered.contains("filesTracked=2"), "{rendered}");
        assert!(rendered.contains("processId=7"), "{rendered}");
        assert!(
            rendered.contains(&format!("workspaceRoot=/{}...", "x".repeat(36))),
            "{rendered}"
        );
        assert!(!rendered.contains("sessionId"), "{rendered}");
    }
}
