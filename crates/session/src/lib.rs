//! # Lineage session
//!
//! The per-process cache behind every file tool call.
//!
//! ```text
//! tool call
//!     │
//!     └──> on_tool_call_start       (interrupt gate, new_session with cooldown)
//!            │ CallScope, held until the call returns
//!            ├──> record_access        (fingerprint what the call read or wrote)
//!            ├──> change_section       (external edits to other tracked files)
//!            └──> instruction_section  (AGENTS.md above the target, once per folder)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lineage_session::{LineageConfig, SharedSession, ToolGate};
//!
//! # async fn demo() {
//! let session = SharedSession::new(LineageConfig::default());
//! match session.on_tool_call_start(false).await {
//!     ToolGate::Proceed(mut call) => println!("{}", call.change_section(None)),
//!     ToolGate::Refuse(text) => println!("{text}"),
//! };
//! # }
//! ```

pub mod change;
mod config;
mod error;
mod hooks;
pub mod instructions;
pub mod paginate;
mod paths;
mod state;

pub use change::{detect, ChangeReport, ChangedFile, Observation};
pub use config::{LineageConfig, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
pub use error::{Result, SessionError};
pub use hooks::{CallScope, SharedSession, ToolGate};
pub use instructions::{discover, InstructionDocument};
pub use paginate::{paginate, PageResult};
pub use paths::PathGuard;
pub use state::{FileFingerprint, SessionSnapshot, SessionState};
