use lineage_session::SessionError;
use std::io;

/// Failures a tool reports back to the agent as text. None of these end the session.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ToolError {
    #[error("Error: {0}")]
    Path(#[from] SessionError),
    #[error("Error: File not found: {path} (base directory: {base})")]
    FileNotFound { path: String, base: String },
    #[error("Error: Path is not a file: {path} (base directory: {base})")]
    NotAFile { path: String, base: String },
    #[error("Error: Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("Error: Path is not a directory: {0}")]
    NotADirectory(String),
    #[error("Error reading file: {0}")]
    Read(io::Error),
    #[error("Error writing file: {0}")]
    Write(io::Error),
    #[error("Error deleting {path}: {source}")]
    Delete { path: String, source: io::Error },
    #[error("Error: String not found in file")]
    NoMatch,
    #[error(
        "Error: String found {0} times. Use replace_all=true to replace all, or make the string more specific."
    )]
    Ambiguous(usize),
    #[error("Error: {0}")]
    InvalidRequest(String),
}

pub(crate) type ToolResult<T> = std::result::Result<T, ToolError>;
