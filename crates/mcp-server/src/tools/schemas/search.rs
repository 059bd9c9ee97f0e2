use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Glob matched against paths relative to `path`, e.g. `**/*.rs` or `src/*.toml`.
    #[schemars(description = "Glob pattern, e.g. '**/*.rs' ('**' crosses directories)")]
    pub pattern: String,

    #[schemars(description = "Directory to search, relative to the base directory (default: '.')")]
    #[serde(default)]
    pub path: Option<String>,

    #[schemars(
        description = "Set to true on the first call after a context reset or compaction; clears what the server remembers about this session"
    )]
    #[serde(default)]
    pub new_session: bool,
}
