//! Filesystem work behind the tools, free of session bookkeeping.

use super::error::{ToolError, ToolResult};
use super::util::group_digits;
use globset::GlobBuilder;
use lineage_session::change::mtime_millis;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub(super) struct TextFile {
    pub(super) content: String,
    pub(super) mtime_millis: i64,
}

/// Metadata is taken before the content so a concurrent write shows up as a later change.
pub(super) fn read_text(path: &Path) -> io::Result<TextFile> {
    let mtime = mtime_millis(&fs::metadata(path)?)?;
    let content = fs::read_to_string(path)?;
    Ok(TextFile {
        content,
        mtime_millis: mtime,
    })
}

/// Write `content`, creating parent directories, and return the new modification time.
pub(super) fn write_text(path: &Path, content: &str) -> io::Result<i64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    mtime_millis(&fs::metadata(path)?)
}

/// Exact replacement. Without `replace_all` the needle has to be unique.
pub(super) fn replace_exact(
    content: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> ToolResult<(String, usize)> {
    if old.is_empty() {
        return Err(ToolError::InvalidRequest(
            "old_string must not be empty".to_string(),
        ));
    }
    let count = content.matches(old).count();
    match count {
        0 => Err(ToolError::NoMatch),
        1 => Ok((content.replacen(old, new, 1), 1)),
        n if replace_all => Ok((content.replace(old, new), n)),
        n => Err(ToolError::Ambiguous(n)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ListingEntry {
    pub(super) path: PathBuf,
    pub(super) is_dir: bool,
    pub(super) size: u64,
}

/// Direct children of `dir`, directories first, then by case-insensitive name.
pub(super) fn list_directory(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else {
            continue;
        };
        let path = entry.path();
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };
        entries.push(ListingEntry {
            path,
            is_dir: meta.is_dir(),
            size: meta.len(),
        });
    }
    entries.sort_by_cached_key(|entry| {
        let name = entry
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        (!entry.is_dir, name)
    });
    Ok(entries)
}

/// Markdown table with paths relative to `base`.
pub(super) fn render_listing(entries: &[ListingEntry], base: &Path) -> String {
    let mut lines = vec![
        "| Name | Type | Size |".to_string(),
        "|------|------|------|".to_string(),
    ];
    for entry in entries {
        let relative = entry.path.strip_prefix(base).unwrap_or(&entry.path);
        if entry.is_dir {
            lines.push(format!("| {}/ | 📁 dir | - |", relative.display()));
        } else {
            lines.push(format!(
                "| {} | 📄 file | {} bytes |",
                relative.display(),
                group_digits(entry.size)
            ));
        }
    }
    lines.join("\n")
}

/// Paths below `root` whose root-relative form matches `pattern`, sorted.
///
/// `*` stays within one directory and `**` crosses directories. Entries that resolve outside
/// `base` (through symlinks) are dropped.
pub(super) fn glob_search(root: &Path, pattern: &str, base: &Path) -> ToolResult<Vec<PathBuf>> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|err| ToolError::InvalidRequest(format!("Invalid glob pattern: {err}")))?
        .compile_matcher();

    let mut matches = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("search skipped an entry: {err}");
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !matcher.is_match(relative) {
            continue;
        }
        let inside = entry
            .path()
            .canonicalize()
            .is_ok_and(|resolved| resolved.starts_with(base));
        if inside {
            matches.push(entry.into_path());
        }
    }
    matches.sort();
    Ok(matches)
}
