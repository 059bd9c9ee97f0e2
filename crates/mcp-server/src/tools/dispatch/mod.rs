//! MCP tool dispatch for Lineage.
//!
//! Every tool runs the same frame: the session gate first, the file operation, then the
//! trailing sections, and finally a fire-and-forget update to the tray. The session stays
//! locked from the gate until the last section is built.

use super::error::{ToolError, ToolResult};
use super::schemas::clear::ClearRequest;
use super::schemas::delete::DeleteRequest;
use super::schemas::edit::EditRequest;
use super::schemas::list::ListRequest;
use super::schemas::multi_edit::MultiEditRequest;
use super::schemas::multi_read::MultiReadRequest;
use super::schemas::read::ReadRequest;
use super::schemas::search::SearchRequest;
use super::schemas::write::WriteRequest;
use super::files::{read_text, TextFile};
use crate::control::{tool_label, ControlHandle};
use lineage_session::{CallScope, PathGuard, SharedSession, ToolGate};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod router;
mod service;

/// Lineage MCP service. One per server process.
#[derive(Clone)]
pub struct LineageService {
    tool_router: ToolRouter<Self>,
    guard: Arc<PathGuard>,
    session: SharedSession,
    control: Option<ControlHandle>,
}

impl LineageService {
    pub(super) fn session(&self) -> &SharedSession {
        &self.session
    }

    pub(super) fn guard(&self) -> &PathGuard {
        &self.guard
    }

    pub(super) fn base_display(&self) -> String {
        self.guard.base().display().to_string()
    }

    pub(super) fn resolve(&self, relative: &str) -> ToolResult<PathBuf> {
        Ok(self.guard.resolve(relative)?)
    }

    /// Gate the call. The scope keeps the session to this call until it is dropped;
    /// `Err` carries the advisory of an interrupted session.
    pub(super) async fn begin_call(
        &self,
        new_session: bool,
    ) -> Result<CallScope<'_>, CallToolResult> {
        match self.session.on_tool_call_start(new_session).await {
            ToolGate::Proceed(call) => Ok(call),
            ToolGate::Refuse(advisory) => Err(CallToolResult::error(vec![Content::text(advisory)])),
        }
    }

    /// Resolve, read and fingerprint `requested`. Marks the folder of a directly read
    /// instruction document as provided.
    pub(super) fn read_tracked(
        &self,
        call: &mut CallScope<'_>,
        requested: &str,
    ) -> ToolResult<(PathBuf, TextFile)> {
        let path = self.resolve(requested)?;
        require_file(self, requested, &path)?;
        let file = read_text(&path).map_err(ToolError::Read)?;
        call.record_access(&path, file.mtime_millis, file.content.clone());
        call.mark_instruction_file(&path);
        Ok((path, file))
    }

    /// Report the call to the tray and turn the outcome into tool output.
    pub(super) fn finish(
        &self,
        tool: &str,
        args: &str,
        outcome: ToolResult<String>,
    ) -> Result<CallToolResult, McpError> {
        if let Some(control) = &self.control {
            control.tool_completed(tool_label(tool, args));
        }
        Ok(match outcome {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(err) => {
                log::debug!("{tool} failed: {err}");
                CallToolResult::error(vec![Content::text(err.to_string())])
            }
        })
    }
}

/// `ToolError::FileNotFound` / `NotAFile` for a path that must be an existing file.
pub(super) fn require_file(
    service: &LineageService,
    requested: &str,
    path: &Path,
) -> ToolResult<()> {
    if !path.exists() {
        return Err(ToolError::FileNotFound {
            path: requested.to_string(),
            base: service.base_display(),
        });
    }
    if !path.is_file() {
        return Err(ToolError::NotAFile {
            path: requested.to_string(),
            base: service.base_display(),
        });
    }
    Ok(())
}

/// Existing directory for `requested` (empty means the base itself).
pub(super) fn require_directory(
    service: &LineageService,
    requested: Option<&str>,
) -> ToolResult<PathBuf> {
    let requested = requested.unwrap_or("");
    let path = service.resolve(requested)?;
    if !path.exists() {
        let shown = if requested.is_empty() { "." } else { requested };
        return Err(ToolError::DirectoryNotFound(shown.to_string()));
    }
    if !path.is_dir() {
        return Err(ToolError::NotADirectory(requested.to_string()));
    }
    Ok(path)
}
