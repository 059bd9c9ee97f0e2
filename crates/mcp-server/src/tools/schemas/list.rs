use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListRequest {
    /// Directory relative to the base directory. Default: the base directory itself.
    #[schemars(description = "Directory to list, relative to the base directory (default: '.')")]
    #[serde(default)]
    pub path: Option<String>,

    #[schemars(
        description = "Set to true on the first call after a context reset or compaction; clears what the server remembers about this session"
    )]
    #[serde(default)]
    pub new_session: bool,
}
