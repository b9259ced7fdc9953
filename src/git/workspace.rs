//! Disposable scratch directories for merges and comparisons

use crate::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// A uniquely named directory owned by a single operation
///
/// Names combine a nanosecond timestamp with a random UUID and the directory
/// is created with `create_dir`, so an existing path is never reused. Call
/// [`Workspace::remove`] when the operation ends; dropping an unremoved
/// workspace removes it as well.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    removed: bool,
}

impl Workspace {
    /// Create a fresh directory under `root`
    pub fn create(root: &Path, prefix: &str) -> Result<Self> {
        fs::create_dir_all(root)?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let path = root.join(format!(
            "forkpull-{prefix}-{nanos}-{}",
            uuid::Uuid::new_v4().simple()
        ));
        fs::create_dir(&path)?;
        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory and everything in it
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        remove_tree(&self.path)
    }

    /// Delete the directory, logging instead of returning a failure
    pub fn discard(self) {
        let path = self.path.clone();
        if let Err(e) = self.remove() {
            warn!(path = %path.display(), error = %e, "failed to remove workspace");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.removed {
            if let Err(e) = remove_tree(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove workspace");
            }
        }
    }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_makes_unique_dirs() {
        let temp = TempDir::new().unwrap();
        let a = Workspace::create(temp.path(), "merge").unwrap();
        let b = Workspace::create(temp.path(), "merge").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
    }

    #[test]
    fn test_remove_deletes_contents() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::create(temp.path(), "merge").unwrap();
        let path = ws.path().to_path_buf();
        fs::create_dir_all(path.join("repo/.git")).unwrap();
        fs::write(path.join("repo/file.txt"), "x").unwrap();

        ws.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let temp = TempDir::new().unwrap();
        let path = {
            let ws = Workspace::create(temp.path(), "compare").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_already_gone_is_ok() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::create(temp.path(), "merge").unwrap();
        fs::remove_dir_all(ws.path()).unwrap();
        assert!(ws.remove().is_ok());
    }

    #[test]
    fn test_create_makes_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested/root");
        let ws = Workspace::create(&root, "merge").unwrap();
        assert!(ws.path().starts_with(&root));
    }
}
