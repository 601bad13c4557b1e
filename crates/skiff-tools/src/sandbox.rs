//! Filesystem sandbox
//!
//! Every path a tool touches goes through [`Sandbox::resolve`] first. A path
//! is accepted only if, after lexical normalization and symlink resolution of
//! the part that already exists, it is the sandbox root or nested under it.
//! Rejection happens before any I/O on the target.

use skiff_core::{Result, SkiffError, ToolError};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A directory boundary no tool operation may escape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Open a sandbox rooted at an existing directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| {
            SkiffError::Config(format!(
                "Failed to resolve sandbox root {}: {}",
                root.display(),
                e
            ))
        })?;

        if !canonical.is_dir() {
            return Err(SkiffError::Config(format!(
                "Sandbox root {} is not a directory",
                canonical.display()
            )));
        }

        Ok(Self { root: canonical })
    }

    /// Create the root directory if needed, then open it
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            fs::create_dir_all(root)?;
            tracing::info!("Created sandbox root: {}", root.display());
        }
        Self::new(root)
    }

    /// Canonical absolute root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a sandbox-relative (or absolute) path to an absolute path
    /// inside the sandbox
    pub fn resolve(&self, requested: &str) -> std::result::Result<PathBuf, ToolError> {
        let escape = || ToolError::Containment(requested.to_string());

        let candidate = Path::new(requested);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let normalized = normalize_lexically(&joined).ok_or_else(escape)?;
        let resolved = resolve_existing_prefix(&normalized).ok_or_else(escape)?;

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            debug!(
                "Rejected path {} (resolves to {})",
                requested,
                resolved.display()
            );
            Err(escape())
        }
    }

    /// Whether an existing path, symlinks followed, lies inside the sandbox
    pub fn contains(&self, path: &Path) -> bool {
        path.canonicalize()
            .map(|canonical| canonical.starts_with(&self.root))
            .unwrap_or(false)
    }

    /// Display form of a path relative to the root (`.` for the root itself)
    pub fn relative_display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Ok(relative) => relative.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }

    /// Replace a file's contents in one step: write a sibling temp file,
    /// then rename it over the target
    pub fn atomic_write(&self, path: &Path, contents: &str) -> std::result::Result<(), ToolError> {
        let parent = path
            .parent()
            .ok_or_else(|| ToolError::Io(format!("{} has no parent directory", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        fs::write(&temp_path, contents).map_err(|e| ToolError::from_io(e, &temp_path))?;

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ToolError::from_io(e, path));
        }

        Ok(())
    }

    /// Files below `dir` in path order, yielded as the walk proceeds.
    /// Symlinked directories are not entered and symlinked files pointing
    /// outside the sandbox are skipped.
    pub fn files<'a>(&'a self, dir: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter_map(move |entry| {
                let file_type = entry.file_type()?;
                let path = entry.into_path();
                if file_type.is_file() {
                    Some(path)
                } else if file_type.is_symlink() && path.is_file() && self.contains(&path) {
                    Some(path)
                } else {
                    None
                }
            })
    }

    /// All files below `dir`, sorted
    pub fn walk_files(&self, dir: &Path) -> Vec<PathBuf> {
        self.files(dir).collect()
    }
}

/// Collapse `.` and `..` without touching the filesystem.
///
/// Returns `None` when `..` would climb above the filesystem root.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    Some(normalized)
}

/// Canonicalize the longest existing ancestor and re-attach the rest.
///
/// Any entry that exists but cannot be canonicalized (a dangling symlink,
/// for instance) makes the whole path unresolvable, since writing through it
/// could land anywhere.
fn resolve_existing_prefix(path: &Path) -> Option<PathBuf> {
    for ancestor in path.ancestors() {
        if fs::symlink_metadata(ancestor).is_err() {
            continue;
        }

        let canonical = ancestor.canonicalize().ok()?;
        let remainder = path.strip_prefix(ancestor).ok()?;
        return Some(canonical.join(remainder));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_resolve_relative_path() {
        let (_dir, sandbox) = sandbox();
        let resolved = sandbox.resolve("src/main.rs").unwrap();
        assert_eq!(resolved, sandbox.root().join("src/main.rs"));
    }

    #[test]
    fn test_resolve_root_itself() {
        let (_dir, sandbox) = sandbox();
        assert_eq!(sandbox.resolve(".").unwrap(), sandbox.root());
        assert_eq!(sandbox.resolve("./").unwrap(), sandbox.root());
    }

    #[test]
    fn test_resolve_inner_parent_dir_is_fine() {
        let (_dir, sandbox) = sandbox();
        let resolved = sandbox.resolve("a/b/../c.txt").unwrap();
        assert_eq!(resolved, sandbox.root().join("a/c.txt"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_dir, sandbox) = sandbox();
        assert!(matches!(
            sandbox.resolve("../outside.txt"),
            Err(ToolError::Containment(_))
        ));
        assert!(matches!(
            sandbox.resolve("a/../../outside.txt"),
            Err(ToolError::Containment(_))
        ));
    }

    #[test]
    fn test_resolve_absolute_paths() {
        let (_dir, sandbox) = sandbox();
        assert!(sandbox.resolve("/etc/passwd").is_err());

        let inside = sandbox.root().join("notes.md");
        let resolved = sandbox.resolve(inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved, inside);
    }

    #[test]
    fn test_resolve_rejects_sibling_with_shared_prefix() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("code");
        let sibling = parent.path().join("code-evil");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&sibling).unwrap();

        let sandbox = Sandbox::new(&root).unwrap();
        assert!(sandbox.resolve("../code-evil/x").is_err());
        assert!(sandbox.resolve(sibling.join("x").to_str().unwrap()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let (dir, sandbox) = sandbox();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        assert!(matches!(
            sandbox.resolve("link/secret.txt"),
            Err(ToolError::Containment(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_dangling_symlink() {
        let (dir, sandbox) = sandbox();
        std::os::unix::fs::symlink("/nonexistent/target", dir.path().join("dangling")).unwrap();

        assert!(sandbox.resolve("dangling").is_err());
    }

    #[test]
    fn test_atomic_write_replaces_contents() {
        let (_dir, sandbox) = sandbox();
        let path = sandbox.resolve("file.txt").unwrap();
        fs::write(&path, "old").unwrap();

        sandbox.atomic_write(&path, "new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers: Vec<_> = fs::read_dir(sandbox.root())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_walk_files_is_recursive_and_sorted() {
        let (dir, sandbox) = sandbox();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/deep.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();

        let files: Vec<_> = sandbox
            .walk_files(sandbox.root())
            .iter()
            .map(|p| sandbox.relative_display(p))
            .collect();
        assert_eq!(files, vec!["a.txt", "b/c/deep.txt"]);
    }

    #[test]
    fn test_files_order_matches_sorted_paths() {
        let (dir, sandbox) = sandbox();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/deep.txt"), "").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();

        let walked: Vec<_> = sandbox.files(sandbox.root()).collect();
        let mut sorted = walked.clone();
        sorted.sort();
        assert_eq!(walked, sorted);
        assert_eq!(walked.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_links_leaving_the_sandbox() {
        let (dir, sandbox) = sandbox();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "").unwrap();
        fs::write(dir.path().join("inner.txt"), "").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("outdir")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("secret.txt"),
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path().join("inner.txt"), dir.path().join("alias.txt"))
            .unwrap();

        let files: Vec<_> = sandbox
            .walk_files(sandbox.root())
            .iter()
            .map(|p| sandbox.relative_display(p))
            .collect();
        assert_eq!(files, vec!["alias.txt", "inner.txt"]);
    }

    #[test]
    fn test_create_makes_missing_root() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("nested/code");
        let sandbox = Sandbox::create(&root).unwrap();
        assert!(sandbox.root().is_dir());
    }
}
