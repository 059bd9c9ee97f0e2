//! Unix-socket side of the registry.
//!
//! Every connection gets a reader loop and a writer task fed by an unbounded channel. A
//! connection that registers a session becomes that session's command route until it drops.

use crate::message_log::{Direction, MessageLog};
use crate::registry::Registry;
use anyhow::{Context, Result};
use lineage_protocol::{read_message, write_message, ClearFilter, ControlMessage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch, Mutex, MutexGuard};

struct Route {
    conn: u64,
    tx: mpsc::UnboundedSender<ControlMessage>,
}

/// Shared registry state: sessions, their command routes and the message log.
#[derive(Default)]
pub struct Tray {
    registry: Mutex<Registry>,
    routes: Mutex<HashMap<String, Route>>,
    log: Mutex<MessageLog>,
    next_conn: AtomicU64,
}

impl Tray {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().await
    }

    pub async fn recent_log(&self, n: usize) -> Vec<String> {
        self.log
            .lock()
            .await
            .recent(n)
            .map(|entry| entry.render())
            .collect()
    }

    async fn record(&self, direction: Direction, peer: &str, message: &ControlMessage) {
        self.log.lock().await.record(direction, peer, message);
    }

    /// Queue `message` for one session. False when the session has no live connection.
    pub async fn send_to_session(&self, session_id: &str, message: ControlMessage) -> bool {
        let sent = {
            let mut routes = self.routes.lock().await;
            match routes.get(session_id) {
                Some(route) if route.tx.send(message.clone()).is_ok() => true,
                Some(_) => {
                    routes.remove(session_id);
                    false
                }
                None => false,
            }
        };
        if sent {
            self.record(Direction::Sent, session_id, &message).await;
        } else {
            log::warn!("cannot send {} to {session_id}: not connected", message.kind());
        }
        sent
    }

    pub async fn clear(&self, session_id: &str) -> bool {
        self.send_to_session(session_id, ControlMessage::ClearCache)
            .await
    }

    pub async fn interrupt(&self, session_id: &str) -> bool {
        let sent = self
            .send_to_session(session_id, ControlMessage::Interrupt)
            .await;
        if sent {
            self.registry().await.set_interrupted(session_id, true);
        }
        sent
    }

    pub async fn resume(&self, session_id: &str) -> bool {
        let sent = self
            .send_to_session(session_id, ControlMessage::Resume)
            .await;
        if sent {
            self.registry().await.set_interrupted(session_id, false);
        }
        sent
    }

    /// Targeted `clear_cache` to every session of `root`. Returns `(sent, matched)`.
    pub async fn clear_root(&self, root: &str) -> (usize, usize) {
        let ids = self.registry().await.ids_for_root(root);
        let mut sent = 0;
        for id in &ids {
            if self.clear(id).await {
                sent += 1;
            }
        }
        (sent, ids.len())
    }

    /// Clear every session the filter selects and remember them as compactions.
    pub async fn clear_by_filter(&self, filter: &ClearFilter) -> usize {
        let ids = self.registry().await.find_by_filter(filter);
        let mut cleared = 0;
        for id in &ids {
            if self.clear(id).await {
                self.registry().await.record_compaction(id);
                cleared += 1;
            }
        }
        log::info!(
            "clear_by_filter for {} ({}) cleared {cleared} session(s)",
            filter.base_dir.as_deref().unwrap_or("any root"),
            filter.client_name.as_deref().unwrap_or("any client"),
        );
        cleared
    }

    async fn bind_route(
        &self,
        session_id: &str,
        conn: u64,
        tx: &mpsc::UnboundedSender<ControlMessage>,
    ) {
        self.routes.lock().await.insert(
            session_id.to_string(),
            Route {
                conn,
                tx: tx.clone(),
            },
        );
    }

    /// Forget `session_id` unless a newer connection has taken it over.
    async fn release(&self, session_id: &str, conn: u64) {
        let mut routes = self.routes.lock().await;
        if routes.get(session_id).is_some_and(|route| route.conn != conn) {
            return;
        }
        routes.remove(session_id);
        drop(routes);
        if self.registry().await.remove(session_id).is_some() {
            log::info!("session {session_id} disconnected");
        }
    }
}

/// Bind `socket_path`, replacing a stale socket file. `None` when another registry answers.
pub async fn bind_single_instance(socket_path: &Path) -> Result<Option<UnixListener>> {
    if let Some(parent) = socket_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match UnixListener::bind(socket_path) {
        Ok(listener) => return Ok(Some(listener)),
        Err(err) => {
            if UnixStream::connect(socket_path).await.is_ok() {
                return Ok(None);
            }
            log::debug!(
                "tray socket bind failed ({}), treating as stale and retrying: {err}",
                socket_path.display()
            );
        }
    }

    let _ = tokio::fs::remove_file(socket_path).await;
    Ok(Some(UnixListener::bind(socket_path).with_context(
        || format!("failed to bind {}", socket_path.display()),
    )?))
}

/// Accept connections until `shutdown` flips to true, then remove the socket file.
pub async fn serve(
    tray: Arc<Tray>,
    listener: UnixListener,
    socket_path: PathBuf,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            res = listener.accept() => {
                let (stream, _) = res.context("accept tray connection")?;
                let tray = tray.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_conn(tray, stream).await {
                        log::warn!("tray connection error: {err:#}");
                    }
                });
            }
        }
    }

    let _ = tokio::fs::remove_file(&socket_path).await;
    Ok(())
}

async fn handle_conn(tray: Arc<Tray>, stream: UnixStream) -> Result<()> {
    let conn = tray.next_conn.fetch_add(1, Ordering::Relaxed);
    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ControlMessage>();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(err) = write_message(&mut write_half, &message).await {
                log::debug!("tray write failed: {err}");
                break;
            }
        }
    });

    let mut reader = BufReader::new(read_half);
    let mut bound: Option<String> = None;
    let outcome = loop {
        let message = match read_message(&mut reader).await {
            Ok(Some(message)) => message,
            Ok(None) => break Ok(()),
            Err(err) if err.is_recoverable() => {
                log::debug!("ignoring malformed message on connection {conn}: {err}");
                continue;
            }
            Err(err) => break Err(anyhow::Error::new(err).context("read tray message")),
        };

        let peer = match &message {
            ControlMessage::Register(report) | ControlMessage::Update(report) => {
                report.session_id.clone()
            }
            _ => bound.clone().unwrap_or_else(|| format!("conn#{conn}")),
        };
        tray.record(Direction::Received, &peer, &message).await;

        match message {
            ControlMessage::Register(report) | ControlMessage::Update(report) => {
                let session_id = report.session_id.clone();
                if bound.as_deref() != Some(session_id.as_str()) {
                    if let Some(previous) = bound.take() {
                        tray.release(&previous, conn).await;
                    }
                    tray.bind_route(&session_id, conn, &tx).await;
                    bound = Some(session_id.clone());
                }
                let root = report.workspace_root.clone();
                if tray.registry().await.upsert(report) {
                    log::info!("session {session_id} registered for {root}");
                }
            }
            ControlMessage::Unregister { session_id } => {
                tray.release(&session_id, conn).await;
                if bound.as_deref() == Some(session_id.as_str()) {
                    bound = None;
                }
            }
            ControlMessage::List => {
                let groups = tray.registry().await.groups();
                reply(&tray, &tx, &peer, ControlMessage::SessionList { groups }).await;
            }
            ControlMessage::ClearByFilter(filter) => {
                let sessions_cleared = tray.clear_by_filter(&filter).await;
                reply(
                    &tray,
                    &tx,
                    &peer,
                    ControlMessage::ClearByFilterResult { sessions_cleared },
                )
                .await;
            }
            other => log::debug!("ignoring {} from {peer}", other.kind()),
        }
    };

    if let Some(session_id) = bound {
        tray.release(&session_id, conn).await;
    }
    drop(tx);
    let _ = writer.await;
    outcome
}

async fn reply(
    tray: &Tray,
    tx: &mpsc::UnboundedSender<ControlMessage>,
    peer: &str,
    message: ControlMessage,
) {
    tray.record(Direction::Sent, peer, &message).await;
    let _ = tx.send(message);
}
