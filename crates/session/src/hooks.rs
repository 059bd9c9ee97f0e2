use crate::change::{format_changed_files, scan_tracked};
use crate::config::LineageConfig;
use crate::instructions::{discover, format_instruction_documents, is_instruction_file};
use crate::state::{FileFingerprint, SessionSnapshot, SessionState};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};

/// Outcome of the check every tool call performs first.
pub enum ToolGate<'a> {
    /// The call may run; the scope keeps the session locked until it is dropped.
    Proceed(CallScope<'a>),
    /// The session is interrupted; return this text and touch nothing.
    Refuse(String),
}

/// Handle to the session cache, shared by tool handlers and the control channel.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<SessionState>,
    config: LineageConfig,
}

impl SharedSession {
    pub fn new(config: LineageConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::new()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &LineageConfig {
        &self.inner.config
    }

    /// Gate a tool call. On `Proceed` the returned scope holds the session until the call
    /// ends, so control commands and other calls land before or after it, never inside.
    pub async fn on_tool_call_start(&self, new_session: bool) -> ToolGate<'_> {
        let mut state = self.inner.state.lock().await;
        if state.is_interrupted() {
            return ToolGate::Refuse(self.inner.config.interrupt_message.clone());
        }
        if new_session
            && state.try_new_session(Instant::now(), self.inner.config.new_session_cooldown())
        {
            log::debug!("new session requested, caches cleared");
        }
        ToolGate::Proceed(CallScope {
            state,
            config: &self.inner.config,
        })
    }

    pub async fn force_clear(&self) {
        self.inner.state.lock().await.force_clear(Instant::now());
    }

    pub async fn interrupt(&self) {
        self.inner.state.lock().await.interrupt();
    }

    pub async fn resume(&self) {
        self.inner.state.lock().await.resume();
    }

    pub async fn files_tracked(&self) -> usize {
        self.inner.state.lock().await.files_tracked()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().await.snapshot()
    }
}

/// Exclusive access to the session for the duration of one tool call.
pub struct CallScope<'a> {
    state: MutexGuard<'a, SessionState>,
    config: &'a LineageConfig,
}

impl CallScope<'_> {
    /// Remember what this call just read or wrote, so its own writes never count as changes.
    pub fn record_access(&mut self, path: &Path, mtime_millis: i64, content: String) {
        self.state.track(
            path.to_path_buf(),
            FileFingerprint {
                mtime_millis,
                content,
            },
        );
    }

    pub fn untrack(&mut self, path: &Path) {
        self.state.untrack(path);
    }

    /// An instruction document the agent opened directly does not need to be appended later.
    pub fn mark_instruction_file(&mut self, path: &Path) {
        if !is_instruction_file(path, &self.config.instruction_file_names) {
            return;
        }
        if let Some(folder) = path.parent() {
            self.state.mark_folder_provided(folder.to_path_buf());
        }
    }

    /// `[CHANGED_FILES]` for every tracked file except `current_path`; empty when nothing changed.
    pub fn change_section(&mut self, current_path: Option<&Path>) -> String {
        let changed = scan_tracked(&mut self.state, current_path);
        format_changed_files(&changed)
    }

    /// Instruction documents above `target` not yet shown in this session.
    pub fn instruction_section(&mut self, target: &Path, root: &Path) -> String {
        let documents = discover(
            target,
            root,
            &self.config.instruction_file_names,
            &mut self.state,
        );
        format_instruction_documents(&documents)
    }

    pub fn force_clear(&mut self) {
        self.state.force_clear(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn session() -> SharedSession {
        SharedSession::new(LineageConfig::default())
    }

    async fn scope(session: &SharedSession, new_session: bool) -> CallScope<'_> {
        match session.on_tool_call_start(new_session).await {
            ToolGate::Proceed(scope) => scope,
            ToolGate::Refuse(text) => panic!("unexpected refusal: {text}"),
        }
    }

    #[tokio::test]
    async fn interrupted_session_refuses_without_clearing() {
        let session = session();
        scope(&session, false)
            .await
            .record_access(Path::new("/w/a.txt"), 1, "a".to_string());
        session.interrupt().await;

        match session.on_tool_call_start(true).await {
            ToolGate::Refuse(text) => {
                assert_eq!(text, LineageConfig::default().interrupt_message)
            }
            ToolGate::Proceed(_) => panic!("interrupted session must refuse"),
        }
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.files_tracked, 1);
        assert_eq!(snapshot.clear_count, 0);

        session.resume().await;
        assert!(matches!(
            session.on_tool_call_start(false).await,
            ToolGate::Proceed(_)
        ));
    }

    #[tokio::test]
    async fn new_session_bursts_clear_once() {
        let session = session();
        drop(scope(&session, true).await);
        drop(scope(&session, true).await);
        assert_eq!(session.snapshot().await.clear_count, 1);

        session.force_clear().await;
        assert_eq!(session.snapshot().await.clear_count, 2);
    }

    #[tokio::test]
    async fn huge_cooldown_still_gates_new_sessions() {
        let session = SharedSession::new(LineageConfig {
            new_session_cooldown_seconds: 1e30,
            ..LineageConfig::default()
        });
        drop(scope(&session, true).await);
        drop(scope(&session, true).await);
        assert_eq!(session.snapshot().await.clear_count, 1);
    }

    #[tokio::test]
    async fn own_writes_are_invisible_and_external_edits_are_reported_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "one\ntwo\n").unwrap();

        let session = session();
        let mut call = scope(&session, false).await;
        call.record_access(&path, 0, "one\ntwo\n".to_string());
        assert_eq!(call.change_section(Some(path.as_path())), "");
        drop(call);

        fs::write(&path, "one\n2\n").unwrap();
        let mut call = scope(&session, false).await;
        let section = call.change_section(None);
        assert!(section.starts_with("[CHANGED_FILES]\n- "), "{section}");
        assert!(section.contains("(modified): lines 2-EOF"), "{section}");
        assert_eq!(call.change_section(None), "");
    }

    #[tokio::test]
    async fn concurrent_call_waits_for_a_write_to_be_fingerprinted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.txt");
        fs::write(&path, "first\n").unwrap();
        let session = session();
        scope(&session, false)
            .await
            .record_access(&path, 0, "first\n".to_string());

        let mut writer = scope(&session, false).await;
        fs::write(&path, "first\nsecond\n").unwrap();

        let other = session.clone();
        let scan = tokio::spawn(async move {
            let mut call = scope(&other, false).await;
            call.change_section(None)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!scan.is_finished(), "scan ran inside another call");

        let mtime = crate::change::mtime_millis(&fs::metadata(&path).unwrap()).unwrap();
        writer.record_access(&path, mtime, "first\nsecond\n".to_string());
        drop(writer);
        assert_eq!(scan.await.unwrap(), "");
    }

    #[tokio::test]
    async fn tray_clear_lands_after_the_running_call() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/AGENTS.md"), "rules").unwrap();
        let target = root.join("pkg/a.rs");
        fs::write(&target, "fn a() {}").unwrap();
        let session = session();

        let mut call = scope(&session, false).await;
        call.record_access(&target, 0, "fn a() {}".to_string());

        let tray = session.clone();
        let clear = tokio::spawn(async move { tray.force_clear().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!clear.is_finished(), "clear applied inside a call");

        let section = call.instruction_section(&target, &root);
        assert!(section.ends_with("]\nrules"), "{section}");
        drop(call);
        clear.await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.files_tracked, 0);
        assert_eq!(snapshot.provided_folders, 0);
        assert_eq!(snapshot.clear_count, 1);
    }

    #[tokio::test]
    async fn instruction_files_read_directly_are_not_appended_again() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/AGENTS.md"), "pkg rules").unwrap();

        let session = session();
        let mut call = scope(&session, false).await;
        call.mark_instruction_file(&root.join("pkg/AGENTS.md"));
        assert_eq!(call.instruction_section(&root.join("pkg/lib.rs"), &root), "");

        call.force_clear();
        let section = call.instruction_section(&root.join("pkg/lib.rs"), &root);
        assert_eq!(
            section,
            format!("[Appending {}]\npkg rules", root.join("pkg/AGENTS.md").display())
        );
    }
}
