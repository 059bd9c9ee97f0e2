//! Lineage MCP tool surface.
//!
//! Schemas, dispatch and the filesystem helpers live in separate submodules; the session
//! bookkeeping itself lives in `lineage-session`.

pub(crate) mod catalog;
mod dispatch;
mod error;
mod files;
mod schemas;
mod util;

pub use dispatch::LineageService;
