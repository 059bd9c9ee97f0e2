use rmcp::schemars;
use serde::Deserialize;

/// One replacement. Fields are optional here so a malformed edit fails alone.
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct EditOperation {
    #[schemars(description = "File path, relative to the base directory")]
    #[serde(default)]
    pub file_path: Option<String>,

    #[schemars(description = "Exact text to replace")]
    #[serde(default)]
    pub old_string: Option<String>,

    #[schemars(description = "Replacement text")]
    #[serde(default)]
    pub new_string: Option<String>,

    #[schemars(description = "Replace every occurrence (default: false)")]
    #[serde(default)]
    pub replace_all: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MultiEditRequest {
    /// Applied in order; a failed edit does not stop the rest.
    #[schemars(description = "Edits applied in order; each one succeeds or fails on its own")]
    #[serde(default)]
    pub edits: Vec<EditOperation>,

    #[schemars(
        description = "Set to true on the first call after a context reset or compaction; clears what the server remembers about this session"
    )]
    #[serde(default)]
    pub new_session: bool,
}
