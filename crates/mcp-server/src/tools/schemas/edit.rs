use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EditRequest {
    #[schemars(description = "File path, relative to the base directory")]
    pub file_path: String,

    /// Exact text to find. Must be unique unless `replace_all` is set.
    #[schemars(description = "Exact text to replace; must occur exactly once unless replace_all")]
    pub old_string: String,

    #[schemars(description = "Replacement text")]
    pub new_string: String,

    #[schemars(description = "Replace every occurrence (default: false)")]
    #[serde(default)]
    pub replace_all: bool,

    #[schemars(
        description = "Set to true on the first call after a context reset or compaction; clears what the server remembers about this session"
    )]
    #[serde(default)]
    pub new_session: bool,
}
