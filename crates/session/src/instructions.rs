//! Directory-scoped instruction documents (`AGENTS.md` and friends).

use crate::state::SessionState;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDocument {
    pub directory: PathBuf,
    pub path: PathBuf,
    pub content: String,
}

pub fn is_instruction_file(path: &Path, recognized_names: &[String]) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| recognized_names.iter().any(|known| known == name))
}

/// First recognized document present in `directory`, in priority order.
fn find_in(directory: &Path, recognized_names: &[String]) -> Option<PathBuf> {
    recognized_names
        .iter()
        .map(|name| directory.join(name))
        .find(|candidate| candidate.is_file())
}

/// Collect the instruction documents above `target` that this session has not seen yet.
///
/// Walks from the parent of `target` up to `root`, nearest directory first. Every returned
/// directory is marked as provided immediately. `root` itself only participates once the session
/// has been cleared at least twice.
pub fn discover(
    target: &Path,
    root: &Path,
    recognized_names: &[String],
    state: &mut SessionState,
) -> Vec<InstructionDocument> {
    let mut found = Vec::new();
    let include_root = state.clear_count() >= 2;

    let mut current = target.parent();
    while let Some(directory) = current {
        if !directory.starts_with(root) {
            break;
        }
        let is_root = directory == root;

        if (!is_root || include_root) && !state.is_folder_provided(directory) {
            if let Some(path) = find_in(directory, recognized_names) {
                match fs::read_to_string(&path) {
                    Ok(content) => {
                        state.mark_folder_provided(directory.to_path_buf());
                        found.push(InstructionDocument {
                            directory: directory.to_path_buf(),
                            path,
                            content,
                        });
                    }
                    Err(err) => {
                        log::debug!("skipping unreadable {}: {err}", path.display());
                    }
                }
            }
        }

        if is_root {
            break;
        }
        current = directory.parent();
    }
    found
}

/// `[Appending <path>]` blocks, one per document.
pub fn format_instruction_documents(documents: &[InstructionDocument]) -> String {
    documents
        .iter()
        .map(|doc| format!("[Appending {}]\n{}", doc.path.display(), doc.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
