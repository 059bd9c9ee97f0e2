use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadRequest {
    /// File path relative to the base directory
    #[schemars(description = "File path, relative to the base directory")]
    pub file_path: String,

    /// Zero-based line to start from (line window mode)
    #[schemars(description = "Line to start from, 0-based (cannot be combined with 'page')")]
    #[serde(default)]
    pub offset: Option<usize>,

    /// Number of lines to return (line window mode)
    #[schemars(description = "Maximum number of lines to return (cannot be combined with 'page')")]
    #[serde(default)]
    pub limit: Option<usize>,

    /// Zero-based page of a large file. Pages are stable for unchanged content.
    #[schemars(
        description = "Page index for large files, 0-based; pages are fixed windows of the read limit"
    )]
    #[serde(default)]
    pub page: Option<usize>,

    /// Character offset to resume from, as printed in the continuation footer.
    #[schemars(
        description = "Character offset to continue from. Large files are paged automatically; use the cursor given in the continuation footer"
    )]
    #[serde(default)]
    pub cursor: Option<usize>,

    #[schemars(description = "Prefix every line with 'N→' (default: false)")]
    #[serde(default)]
    pub show_line_numbers: bool,

    #[schemars(
        description = "Set to true on the first call after a context reset or compaction; clears what the server remembers about this session"
    )]
    #[serde(default)]
    pub new_session: bool,
}
