//! Optional link to the `lineage-tray` registry.
//!
//! The registry is never required: every failure here is logged at debug level and the server
//! keeps serving tools. Outgoing traffic goes through one actor task so the socket writer has a
//! single owner; incoming commands are applied to the session from a separate reader task.

use lineage_protocol::{
    ancestor_chain, read_message, write_message, ControlMessage, SessionReport, MAX_ANCESTOR_DEPTH,
};
use lineage_session::SharedSession;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ControlOptions {
    pub socket_path: PathBuf,
    pub workspace_root: String,
    pub reconnect_interval: Duration,
}

enum Outbound {
    ToolCompleted(String),
    ClientLabel(String),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap handle used by tool handlers; all sends are fire-and-forget.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ControlHandle {
    pub fn spawn(session: SharedSession, options: ControlOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = ControlChannel::new(session, options);
        tokio::spawn(channel.run(rx));
        Self { tx }
    }

    /// `label` is the `[tool:args]` summary shown by the registry.
    pub fn tool_completed(&self, label: String) {
        let _ = self.tx.send(Outbound::ToolCompleted(label));
    }

    pub fn set_client_label(&self, label: String) {
        let _ = self.tx.send(Outbound::ClientLabel(label));
    }

    /// Unregister and close the link, waiting briefly for the actor to finish.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Outbound::Shutdown(done_tx)).is_err() {
            return;
        }
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, done_rx).await;
    }
}

struct Link {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

struct ControlChannel {
    session: SharedSession,
    options: ControlOptions,
    session_id: String,
    started_at_ms: u64,
    ancestor_pids: Vec<u32>,
    ancestor_names: Vec<String>,
    client_label: Option<String>,
    first_call: Option<String>,
    last_tool: Option<String>,
    link: Option<Link>,
    last_attempt: Option<Instant>,
}

impl ControlChannel {
    fn new(session: SharedSession, options: ControlOptions) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let (ancestor_pids, ancestor_names): (Vec<u32>, Vec<String>) =
            ancestor_chain(MAX_ANCESTOR_DEPTH).into_iter().unzip();
        Self {
            session,
            options,
            session_id: format!("{}_{}", std::process::id(), now.as_secs()),
            started_at_ms: u64::try_from(now.as_millis()).unwrap_or(u64::MAX),
            ancestor_pids,
            ancestor_names,
            client_label: None,
            first_call: None,
            last_tool: None,
            link: None,
            last_attempt: None,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Outbound>) {
        self.connect().await;
        while let Some(message) = rx.recv().await {
            match message {
                Outbound::ToolCompleted(label) => {
                    if self.first_call.is_none() {
                        self.first_call = Some(label.clone());
                    }
                    self.last_tool = Some(label);
                    self.push_update().await;
                }
                Outbound::ClientLabel(label) => {
                    self.client_label = Some(label);
                    self.push_update().await;
                }
                Outbound::Shutdown(done) => {
                    self.disconnect().await;
                    let _ = done.send(());
                    return;
                }
            }
        }
        self.disconnect().await;
    }

    fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| !link.reader.is_finished())
    }

    fn reconnect_due(&self) -> bool {
        self.last_attempt
            .is_none_or(|at| at.elapsed() >= self.options.reconnect_interval)
    }

    async fn push_update(&mut self) {
        if self.is_connected() {
            let report = self.report().await;
            self.send(ControlMessage::Update(report)).await;
        } else if self.reconnect_due() {
            // A fresh register carries the full report.
            self.connect().await;
        }
    }

    async fn connect(&mut self) -> bool {
        self.last_attempt = Some(Instant::now());
        self.drop_link();

        let stream = match UnixStream::connect(&self.options.socket_path).await {
            Ok(stream) => stream,
            Err(err) => {
                log::debug!(
                    "tray registry unavailable at {}: {err}",
                    self.options.socket_path.display()
                );
                return false;
            }
        };
        let (read_half, writer) = stream.into_split();
        let reader = tokio::spawn(apply_commands(
            BufReader::new(read_half),
            self.session.clone(),
        ));
        self.link = Some(Link { writer, reader });

        let report = self.report().await;
        let registered = self.send(ControlMessage::Register(report)).await;
        if registered {
            log::debug!("registered session {} with the tray", self.session_id);
        }
        registered
    }

    async fn send(&mut self, message: ControlMessage) -> bool {
        let Some(link) = self.link.as_mut() else {
            return false;
        };
        match write_message(&mut link.writer, &message).await {
            Ok(()) => true,
            Err(err) => {
                log::debug!("tray link lost while sending {}: {err}", message.kind());
                self.drop_link();
                false
            }
        }
    }

    async fn disconnect(&mut self) {
        if self.is_connected() {
            let session_id = self.session_id.clone();
            self.send(ControlMessage::Unregister { session_id }).await;
        }
        self.drop_link();
    }

    fn drop_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.reader.abort();
        }
    }

    async fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            process_id: std::process::id(),
            workspace_root: self.options.workspace_root.clone(),
            client_label: self.client_label.clone(),
            files_tracked: self.session.files_tracked().await,
            last_tool: self.last_tool.clone(),
            first_call: self.first_call.clone(),
            started_at_ms: self.started_at_ms,
            ancestor_pids: self.ancestor_pids.clone(),
            ancestor_names: self.ancestor_names.clone(),
        }
    }
}

async fn apply_commands<R: AsyncBufRead + Unpin>(mut reader: R, session: SharedSession) {
    loop {
        match read_message(&mut reader).await {
            Ok(Some(message)) => apply_command(&session, message).await,
            Ok(None) => {
                log::debug!("tray closed the control link");
                return;
            }
            Err(err) if err.is_recoverable() => {
                log::debug!("ignoring malformed tray message: {err}");
            }
            Err(err) => {
                log::debug!("tray control link failed: {err}");
                return;
            }
        }
    }
}

async fn apply_command(session: &SharedSession, message: ControlMessage) {
    match message {
        ControlMessage::ClearCache => {
            session.force_clear().await;
            log::info!("cache cleared by the tray");
        }
        ControlMessage::Interrupt => {
            session.interrupt().await;
            log::info!("session interrupted by the tray");
        }
        ControlMessage::Resume => {
            session.resume().await;
            log::info!("session resumed by the tray");
        }
        other => log::debug!("ignoring {} from the tray", other.kind()),
    }
}

/// `[tool:args]`, the form the registry shows as first/last call.
pub fn tool_label(tool: &str, args: &str) -> String {
    if args.is_empty() {
        format!("[{tool}]")
    } else {
        format!("[{tool}:{args}]")
    }
}
