use crate::error::{Result, SessionError};
use std::path::{Component, Path, PathBuf};

/// Confines every tool path to one base directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    base: PathBuf,
}

impl PathGuard {
    pub fn new(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let base = base.canonicalize().map_err(|err| {
            SessionError::InvalidPath(format!("{}: {err}", base.display()))
        })?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Absolute path for `relative`, or `PathOutsideRoot` when it escapes the base.
    ///
    /// `..` is folded lexically and the deepest existing ancestor is canonicalized, so a symlink
    /// pointing outside the base is rejected even when the final component does not exist yet.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        if relative.contains('\0') {
            return Err(SessionError::InvalidPath(
                "path contains a NUL byte".to_string(),
            ));
        }

        let joined = self.base.join(relative);
        let normalized = normalize_lexically(&joined);
        let resolved = canonicalize_existing_prefix(&normalized)?;
        if !resolved.starts_with(&self.base) {
            return Err(SessionError::PathOutsideRoot(resolved));
        }
        Ok(resolved)
    }

    /// Path relative to the base, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.base).unwrap_or(path)
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolves_inside_the_base() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();

        let base = guard.base().to_path_buf();
        assert_eq!(guard.resolve("src/main.rs").unwrap(), base.join("src/main.rs"));
        assert_eq!(guard.resolve("").unwrap(), base);
        assert_eq!(guard.resolve("./src/../src/x").unwrap(), base.join("src/x"));
        assert_eq!(guard.relative(&base.join("src/x")), Path::new("src/x"));
    }

    #[test]
    fn rejects_parent_escapes_and_absolute_paths() {
        let dir = tempdir().unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();

        assert!(matches!(
            guard.resolve("../outside.txt"),
            Err(SessionError::PathOutsideRoot(_))
        ));
        assert!(matches!(
            guard.resolve("/etc/passwd"),
            Err(SessionError::PathOutsideRoot(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlinks_leading_outside() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();

        assert!(matches!(
            guard.resolve("link/new.txt"),
            Err(SessionError::PathOutsideRoot(_))
        ));
    }

    #[test]
    fn missing_base_is_an_invalid_path() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            PathGuard::new(dir.path().join("missing")),
            Err(SessionError::InvalidPath(_))
        ));
    }
}
