//! # Lineage tray
//!
//! Registry side of the lineage control channel. Serving `lineage-mcp` processes register over
//! a Unix socket and report after every tool call; the operator clears, pauses and resumes them
//! by session id, and pre-compaction hooks clear every session a client owns in one directory.
//!
//! ```text
//! lineage-mcp ─┐                    ┌─ console (stdin)
//! lineage-mcp ─┼─▶ server ─▶ Registry ◀┤
//! hook/status ─┘        │           └─ message log
//!                       └─▶ clear_cache / interrupt / resume
//! ```

pub mod console;
pub mod hook;
pub mod message_log;
pub mod registry;
pub mod server;
