//! Read-only access to a repository's object store

use crate::error::{Error, Result};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

pub use gix::ObjectId;

/// Bytes sniffed when guessing whether a blob is an image
const SNIFF_LEN: usize = 1024;

/// An opened repository object store
pub struct RepoHandle {
    repo: gix::Repository,
    path: PathBuf,
}

impl std::fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoHandle").field("path", &self.path).finish()
    }
}

impl RepoHandle {
    /// Open the store at `path`
    ///
    /// Fails with `NotFound` when the path is missing or is not a git
    /// repository.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "repository at {}",
                path.display()
            )));
        }
        let repo = gix::open(path).map_err(|e| {
            Error::NotFound(format!("repository at {}: {e}", path.display()))
        })?;
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Path the handle was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The store's `objects` directory
    pub fn objects_dir(&self) -> PathBuf {
        self.repo.git_dir().join("objects")
    }

    /// Resolve `refs/heads/<branch>` to the commit it points at
    pub fn resolve_branch(&self, branch: &str) -> Result<ObjectId> {
        let not_found = || {
            Error::NotFound(format!(
                "branch '{branch}' in {}",
                self.path.display()
            ))
        };
        if branch.is_empty() {
            return Err(not_found());
        }

        let name = format!("refs/heads/{branch}");
        let mut reference = self
            .repo
            .try_find_reference(name.as_str())
            .map_err(|_| not_found())?
            .ok_or_else(not_found)?;
        let id = reference
            .peel_to_id()
            .map_err(|e| Error::Git(format!("{name}: {e}")))?;
        Ok(id.detach())
    }

    /// Full content of the blob at `path` in `commit`'s tree
    pub fn blob_at(&self, commit: ObjectId, path: &str) -> Result<Vec<u8>> {
        let not_found = || Error::NotFound(format!("'{path}' at {commit}"));

        let commit_obj = self
            .repo
            .find_commit(commit)
            .map_err(|e| Error::NotFound(format!("commit {commit}: {e}")))?;
        let tree = commit_obj
            .tree()
            .map_err(|e| Error::Git(format!("tree of {commit}: {e}")))?;
        let entry = tree
            .lookup_entry_by_path(path)
            .map_err(|e| Error::Git(format!("'{path}' at {commit}: {e}")))?
            .ok_or_else(not_found)?;
        if !entry.mode().is_blob() {
            return Err(not_found());
        }

        let object = self
            .repo
            .find_object(entry.object_id())
            .map_err(|e| Error::Git(format!("blob for '{path}': {e}")))?;
        Ok(object.detach().data)
    }

    /// Reader over the blob at `path` in `commit`'s tree
    ///
    /// The blob is decoded into memory before the reader is returned, so
    /// this does not bound memory use for large blobs.
    pub fn blob_reader(&self, commit: ObjectId, path: &str) -> Result<impl Read + use<>> {
        Ok(Cursor::new(self.blob_at(commit, path)?))
    }

    /// Whether the blob at `path` looks like an image
    ///
    /// Any lookup failure is treated as "not an image".
    pub fn is_image_file(&self, commit: ObjectId, path: &str) -> bool {
        let Ok(reader) = self.blob_reader(commit, path) else {
            return false;
        };
        let mut head = Vec::with_capacity(SNIFF_LEN);
        if reader.take(SNIFF_LEN as u64).read_to_end(&mut head).is_err() {
            return false;
        }
        image_kind(&head).is_some()
    }
}

/// Recognize common image formats by their magic bytes
pub fn image_kind(head: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
        (b"\x00\x00\x01\x00", "image/x-icon"),
    ];

    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, mime)| *mime)
}

/// Resolve a branch tip on the blocking pool
pub async fn resolve_tip(repo_path: &Path, branch: &str) -> Result<ObjectId> {
    let repo_path = repo_path.to_path_buf();
    let branch = branch.to_string();
    tokio::task::spawn_blocking(move || RepoHandle::open(&repo_path)?.resolve_branch(&branch))
        .await
        .map_err(|e| Error::Internal(format!("branch lookup task failed: {e}")))?
}

/// Resolve a branch tip and the store's object directory on the blocking pool
pub(crate) async fn resolve_tip_and_objects(
    repo_path: &Path,
    branch: &str,
) -> Result<(ObjectId, PathBuf)> {
    let repo_path = repo_path.to_path_buf();
    let branch = branch.to_string();
    tokio::task::spawn_blocking(move || {
        let handle = RepoHandle::open(&repo_path)?;
        let tip = handle.resolve_branch(&branch)?;
        let objects = std::fs::canonicalize(handle.objects_dir())?;
        Ok((tip, objects))
    })
    .await
    .map_err(|e| Error::Internal(format!("branch lookup task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_kind_png() {
        let head = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(image_kind(head), Some("image/png"));
    }

    #[test]
    fn test_image_kind_webp() {
        let head = b"RIFF\x10\0\0\0WEBPVP8 ";
        assert_eq!(image_kind(head), Some("image/webp"));
    }

    #[test]
    fn test_image_kind_text() {
        assert_eq!(image_kind(b"fn main() {}\n"), None);
        assert_eq!(image_kind(b""), None);
    }

    #[test]
    fn test_open_missing_path_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = RepoHandle::open(&temp.path().join("missing.git")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_plain_directory_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = RepoHandle::open(temp.path()).unwrap_err();
        assert!(err.is_not_found());
    }
}
