use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Last observed `(mtime, content)` of a file this session has read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub mtime_millis: i64,
    pub content: String,
}

/// Per-process cache shared by every tool call.
///
/// `tracked` and `provided_folders` are always emptied together; `clear_count` is the only
/// field that survives a clear, and `interrupted` is never touched by one.
#[derive(Debug, Default)]
pub struct SessionState {
    tracked: HashMap<PathBuf, FileFingerprint>,
    provided_folders: HashSet<PathBuf>,
    last_clear: Option<Instant>,
    clear_count: u64,
    interrupted: bool,
}

/// Point-in-time copy of the counters, for status reporting and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub files_tracked: usize,
    pub provided_folders: usize,
    pub clear_count: u64,
    pub interrupted: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_clear(&mut self, now: Instant) {
        self.tracked.clear();
        self.provided_folders.clear();
        self.last_clear = Some(now);
        self.clear_count += 1;
    }

    /// Clear unless the previous clear happened less than `cooldown` ago.
    pub fn try_new_session(&mut self, now: Instant, cooldown: Duration) -> bool {
        let due = match self.last_clear {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= cooldown,
        };
        if due {
            self.force_clear(now);
        }
        due
    }

    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn resume(&mut self) {
        self.interrupted = false;
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn clear_count(&self) -> u64 {
        self.clear_count
    }

    pub fn track(&mut self, path: PathBuf, fingerprint: FileFingerprint) {
        self.tracked.insert(path, fingerprint);
    }

    pub fn untrack(&mut self, path: &Path) -> Option<FileFingerprint> {
        self.tracked.remove(path)
    }

    pub fn fingerprint(&self, path: &Path) -> Option<&FileFingerprint> {
        self.tracked.get(path)
    }

    /// Tracked paths in a stable order.
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.tracked.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn files_tracked(&self) -> usize {
        self.tracked.len()
    }

    /// Returns `true` when the folder was not marked before.
    pub fn mark_folder_provided(&mut self, folder: PathBuf) -> bool {
        self.provided_folders.insert(folder)
    }

    pub fn is_folder_provided(&self, folder: &Path) -> bool {
        self.provided_folders.contains(folder)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            files_tracked: self.tracked.len(),
            provided_folders: self.provided_folders.len(),
            clear_count: self.clear_count,
            interrupted: self.interrupted,
        }
    }
}
