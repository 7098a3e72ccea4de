//! Sandbox boundary enforcement.
//!
//! Every file operation goes through [`resolve_and_verify`] before touching
//! storage. The containment check runs on the canonicalized absolute form of
//! the path, never on a naive string prefix: crafted `..` sequences and
//! symlinks inside the sandbox can both defeat simpler checks.

use std::path::{Component, Path, PathBuf};

use tracing::{error, warn};

use crate::error::FileSurfaceError;

/// Build a tenant-relative path against the sandbox root without touching
/// the filesystem.
///
/// Rejects parent-directory components outright, even ones that would resolve
/// back inside the sandbox: a `..` in a tenant-supplied path indicates either
/// malice or a confused client, and neither is worth silently correcting.
pub fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf, FileSurfaceError> {
    let relative = relative.trim_start_matches('/');

    if relative.is_empty() || relative == "." {
        return Ok(root.to_path_buf());
    }

    let mut result = root.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(name) => {
                let name_str = name.to_string_lossy();
                if name_str.contains('\0') {
                    warn!("path component contains null byte: {:?}", name);
                    return Err(FileSurfaceError::PathRejected);
                }
                result.push(name);
            }
            Component::ParentDir => {
                warn!("sandbox escape attempt: parent directory (..) in path");
                return Err(FileSurfaceError::PathRejected);
            }
            Component::CurDir => continue,
            Component::RootDir | Component::Prefix(_) => {
                warn!("absolute component in tenant-relative path");
                return Err(FileSurfaceError::PathRejected);
            }
        }
    }

    if !result.starts_with(root) {
        error!("path resolution escaped sandbox root: {:?}", result);
        return Err(FileSurfaceError::PathRejected);
    }

    Ok(result)
}

/// Resolve a tenant-relative path and verify containment after following
/// symlinks.
///
/// For existing paths the canonical form must sit under the canonical root.
/// For paths being created, the nearest existing ancestor is canonicalized
/// and checked instead, so nested not-yet-existing destinations are accepted
/// as long as they cannot escape.
pub fn resolve_and_verify(root: &Path, relative: &str) -> Result<PathBuf, FileSurfaceError> {
    let built_path = resolve_path(root, relative)?;

    let canonical_root = root.canonicalize().map_err(FileSurfaceError::Io)?;

    if built_path.exists() {
        let canonical_path = built_path.canonicalize().map_err(FileSurfaceError::Io)?;

        if !canonical_path.starts_with(&canonical_root) {
            warn!(
                "symlink escape attempt: {:?} resolved to {:?} outside {:?}",
                built_path, canonical_path, canonical_root
            );
            return Err(FileSurfaceError::PathRejected);
        }

        return Ok(canonical_path);
    }

    // Path doesn't exist yet. Walk up to the nearest existing ancestor and
    // verify that it canonicalizes inside the root, then re-append the
    // remaining components.
    let mut ancestor = built_path.as_path();
    while let Some(parent) = ancestor.parent() {
        if parent.exists() {
            let canonical_parent = parent.canonicalize().map_err(FileSurfaceError::Io)?;
            if !canonical_parent.starts_with(&canonical_root) {
                warn!(
                    "ancestor escape: {:?} has ancestor resolving outside sandbox",
                    built_path
                );
                return Err(FileSurfaceError::PathRejected);
            }
            let remainder = built_path
                .strip_prefix(parent)
                .map_err(|_| FileSurfaceError::PathRejected)?;
            return Ok(canonical_parent.join(remainder));
        }
        ancestor = parent;
    }

    Ok(built_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox() -> TempDir {
        TempDir::new().expect("create temp sandbox")
    }

    #[test]
    fn accepts_simple_relative_paths() {
        let dir = sandbox();
        let resolved = resolve_path(dir.path(), "bot.py").unwrap();
        assert_eq!(resolved, dir.path().join("bot.py"));
    }

    #[test]
    fn accepts_empty_and_dot() {
        let dir = sandbox();
        assert_eq!(resolve_path(dir.path(), "").unwrap(), dir.path());
        assert_eq!(resolve_path(dir.path(), ".").unwrap(), dir.path());
    }

    #[test]
    fn strips_leading_slash() {
        let dir = sandbox();
        let resolved = resolve_path(dir.path(), "/src/main.js").unwrap();
        assert_eq!(resolved, dir.path().join("src/main.js"));
    }

    #[test]
    fn rejects_parent_components() {
        let dir = sandbox();
        for path in ["../etc/passwd", "../../etc/passwd", "a/../../b", "a/.."] {
            assert!(
                matches!(
                    resolve_path(dir.path(), path),
                    Err(FileSurfaceError::PathRejected)
                ),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_null_bytes() {
        let dir = sandbox();
        assert!(resolve_path(dir.path(), "evil\0name").is_err());
    }

    #[test]
    fn accepts_nested_nonexistent_creation_path() {
        let dir = sandbox();
        let resolved = resolve_and_verify(dir.path(), "new/deeply/nested/file.txt").unwrap();
        let canonical_root = dir.path().canonicalize().unwrap();
        assert!(resolved.starts_with(&canonical_root));
        assert!(resolved.ends_with("new/deeply/nested/file.txt"));
    }

    #[test]
    fn canonicalizes_existing_paths() {
        let dir = sandbox();
        std::fs::write(dir.path().join("data.txt"), b"x").unwrap();
        let resolved = resolve_and_verify(dir.path(), "data.txt").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("data.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let outside = sandbox();
        let dir = sandbox();
        std::fs::write(outside.path().join("secret.txt"), b"s").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let result = resolve_and_verify(dir.path(), "link/secret.txt");
        assert!(matches!(result, Err(FileSurfaceError::PathRejected)));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_creation_under_escaping_symlink() {
        let outside = sandbox();
        let dir = sandbox();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        // The destination doesn't exist, but its nearest existing ancestor
        // resolves outside the sandbox.
        let result = resolve_and_verify(dir.path(), "link/new.txt");
        assert!(matches!(result, Err(FileSurfaceError::PathRejected)));
    }

    #[cfg(unix)]
    #[test]
    fn accepts_symlink_inside_sandbox() {
        let dir = sandbox();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::fs::write(dir.path().join("real/a.txt"), b"a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let resolved = resolve_and_verify(dir.path(), "alias/a.txt").unwrap();
        assert!(resolved.ends_with("real/a.txt"));
    }
}
