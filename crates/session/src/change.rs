//! Detection of edits made to tracked files by someone other than this session.

use crate::state::{FileFingerprint, SessionState};
use similar::{Algorithm, DiffTag, TextDiff};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

pub const FALLBACK_RANGE: &str = "1-EOF";

const DIFF_DEADLINE: Duration = Duration::from_secs(2);

/// What a tracked file looks like right now. `content` is `None` when it cannot be read as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub mtime_millis: i64,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    /// Compact 1-indexed ranges on the new content, e.g. `3-5,9-EOF`.
    pub ranges: String,
    /// Distance between the previous and the current modification time.
    pub elapsed_millis: i64,
}

impl ChangeReport {
    pub fn age_label(&self) -> String {
        let millis = self.elapsed_millis.unsigned_abs();
        if millis >= 1000 {
            format!("{}", millis / 1000)
        } else {
            format!("{:.2}", millis as f64 / 1000.0)
        }
    }
}

/// Compare a stored fingerprint against a fresh observation.
///
/// The modification time is the only trigger; content equality is never checked on its own.
pub fn detect(previous: Option<&FileFingerprint>, current: &Observation) -> Option<ChangeReport> {
    let previous = previous?;
    if previous.mtime_millis == current.mtime_millis {
        return None;
    }

    let ranges = match current.content.as_deref() {
        Some(content) => changed_line_ranges(&previous.content, content),
        None => {
            log::debug!("changed file is not readable as UTF-8, reporting {FALLBACK_RANGE}");
            FALLBACK_RANGE.to_string()
        }
    };
    Some(ChangeReport {
        ranges,
        elapsed_millis: current.mtime_millis - previous.mtime_millis,
    })
}

/// Zero-context line diff folded into merged ranges over the new content.
pub fn changed_line_ranges(old: &str, new: &str) -> String {
    let new_lines = new.split_inclusive('\n').count();
    if new_lines == 0 {
        return FALLBACK_RANGE.to_string();
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_DEADLINE)
        .diff_lines(old, new);

    let mut spans: Vec<(usize, usize)> = Vec::new();
    for op in diff.ops() {
        let (tag, _, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            continue;
        }
        // Pure deletions are pinned to the line that now sits where the removed text was,
        // or one past the last line when the tail was cut.
        let (start, end) = if new_range.is_empty() {
            let at = new_range.start + 1;
            (at, at)
        } else {
            (new_range.start + 1, new_range.end)
        };
        match spans.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => spans.push((start, end)),
        }
    }

    if spans.is_empty() {
        return format!("1-{new_lines}");
    }

    spans
        .iter()
        .map(|&(start, end)| {
            if end >= new_lines {
                format!("{start}-EOF")
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    Modified(ChangeReport),
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: PathBuf,
    pub status: ChangeStatus,
}

impl fmt::Display for ChangedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ChangeStatus::Modified(report) => write!(
                f,
                "- {} (modified): lines {} ({}s ago)",
                self.path.display(),
                report.ranges,
                report.age_label()
            ),
            ChangeStatus::Deleted => write!(f, "- {} (deleted)", self.path.display()),
        }
    }
}

pub fn mtime_millis(meta: &fs::Metadata) -> std::io::Result<i64> {
    let modified = meta.modified()?;
    let millis = match modified.duration_since(UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    };
    Ok(millis)
}

/// Check every tracked file except `exclude` and fold what changed back into the state.
///
/// Each external change is reported exactly once: fingerprints are overwritten after reporting
/// and vanished files are untracked.
pub fn scan_tracked(state: &mut SessionState, exclude: Option<&Path>) -> Vec<ChangedFile> {
    let mut changed = Vec::new();
    for path in state.tracked_paths() {
        if exclude == Some(path.as_path()) {
            continue;
        }

        let mtime = match fs::metadata(&path).and_then(|meta| mtime_millis(&meta)) {
            Ok(mtime) => mtime,
            Err(_) => {
                state.untrack(&path);
                changed.push(ChangedFile {
                    path,
                    status: ChangeStatus::Deleted,
                });
                continue;
            }
        };

        let (report, content) = {
            let Some(previous) = state.fingerprint(&path) else {
                continue;
            };
            if previous.mtime_millis == mtime {
                continue;
            }
            let observation = Observation {
                mtime_millis: mtime,
                content: fs::read_to_string(&path).ok(),
            };
            let Some(report) = detect(Some(previous), &observation) else {
                continue;
            };
            let content = observation
                .content
                .unwrap_or_else(|| previous.content.clone());
            (report, content)
        };

        state.track(
            path.clone(),
            FileFingerprint {
                mtime_millis: mtime,
                content,
            },
        );
        changed.push(ChangedFile {
            path,
            status: ChangeStatus::Modified(report),
        });
    }
    changed
}

/// `[CHANGED_FILES]` block, or an empty string when nothing changed.
pub fn format_changed_files(changed: &[ChangedFile]) -> String {
    if changed.is_empty() {
        return String::new();
    }
    let mut out = String::from("[CHANGED_FILES]");
    for file in changed {
        out.push('\n');
        out.push_str(&file.to_string());
    }
    out
}
