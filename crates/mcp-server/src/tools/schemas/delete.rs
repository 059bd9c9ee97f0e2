use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteRequest {
    #[schemars(description = "File or empty directory, relative to the base directory")]
    pub file_path: String,

    #[schemars(
        description = "Set to true on the first call after a context reset or compaction; clears what the server remembers about this session"
    )]
    #[serde(default)]
    pub new_session: bool,
}
