use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MultiReadRequest {
    /// At most five paths relative to the base directory
    #[schemars(description = "File paths relative to the base directory (at most 5)")]
    pub file_paths: Vec<String>,

    #[schemars(description = "Prefix every line with 'N→' (default: false)")]
    #[serde(default)]
    pub show_line_numbers: bool,

    #[schemars(
        description = "Set to true on the first call after a context reset or compaction; clears what the server remembers about this session"
    )]
    #[serde(default)]
    pub new_session: bool,
}
