//! Persistence for store state in `state.toml`.

use super::{STATE_VERSION, StoreState};
use crate::config::config_dir;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Filename for store state.
const STATE_FILE: &str = "state.toml";

/// Default path of the state file.
pub fn state_path() -> PathBuf {
    config_dir().join(STATE_FILE)
}

/// Load store state from disk.
///
/// Returns an empty `StoreState` if the file doesn't exist.
pub fn load_state(path: &Path) -> Result<StoreState> {
    if !path.exists() {
        return Ok(StoreState::new());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Store(format!("failed to read {}: {e}", path.display())))?;

    let state: StoreState = toml::from_str(&content)
        .map_err(|e| Error::Store(format!("failed to parse {}: {e}", path.display())))?;

    if state.version > STATE_VERSION {
        return Err(Error::Store(format!(
            "{} was written by a newer version (format {})",
            path.display(),
            state.version
        )));
    }

    Ok(state)
}

/// Save store state to disk.
///
/// Creates the parent directory if it doesn't exist. The file is written to
/// a sibling temp file first and renamed into place.
pub fn save_state(path: &Path, state: &StoreState) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| Error::Store(format!("failed to create {}: {e}", dir.display())))?;
        }
    }

    let mut state_to_save = state.clone();
    state_to_save.version = STATE_VERSION;

    let content = toml::to_string_pretty(&state_to_save)
        .map_err(|e| Error::Store(format!("failed to serialize store state: {e}")))?;

    let content_with_header = format!(
        "# forkpull state\n# Auto-generated - manual edits may be overwritten\n\n{content}"
    );

    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, content_with_header)
        .map_err(|e| Error::Store(format!("failed to write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|e| Error::Store(format!("failed to write {}: {e}", path.display())))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IssueStore, MemoryStore};
    use crate::types::{CommentKind, IssueState, NewIssue, PullKey};
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_returns_empty() {
        let temp = TempDir::new().unwrap();
        let state = load_state(&temp.path().join(STATE_FILE)).unwrap();
        assert!(state.repositories.is_empty());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn test_save_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(STATE_FILE);

        save_state(&path, &StoreState::new()).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[tokio::test]
    async fn test_roundtrip_serialization() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(STATE_FILE);

        let store = MemoryStore::new();
        let upstream = store.add_repository("alice", "widgets", None).unwrap();
        let fork = store
            .add_repository("bob", "widgets", Some(upstream.id))
            .unwrap();
        let created = store
            .create_pull(
                NewIssue {
                    repo_id: upstream.id,
                    title: "Add gadgets".to_string(),
                    content: "Body".to_string(),
                    poster: "bob".to_string(),
                    is_pull: true,
                },
                PullKey {
                    from_repo_id: fork.id,
                    from_branch: "feature".to_string(),
                    to_repo_id: upstream.id,
                    to_branch: "master".to_string(),
                },
            )
            .await
            .unwrap();
        let (issue, pull) = (created.issue().clone(), created.pull().clone());
        store
            .append_comment(issue.id, CommentKind::Merged, "alice", "ship it")
            .await
            .unwrap();
        store.record_merge(pull.id, "abc123", "alice").await.unwrap();
        store
            .set_issue_state(issue.id, IssueState::Merged)
            .await
            .unwrap();

        save_state(&path, &store.snapshot().unwrap()).unwrap();
        let loaded = MemoryStore::from_state(load_state(&path).unwrap());

        assert_eq!(loaded.repositories().unwrap().len(), 2);
        let issue = loaded.get_issue(issue.id).await.unwrap();
        assert_eq!(issue.state, IssueState::Merged);
        assert_eq!(issue.title, "Add gadgets");
        let pull = loaded.get_pull_by_issue(issue.id).await.unwrap();
        assert_eq!(pull.key.from_branch, "feature");
        assert_eq!(pull.merged_commit.as_deref(), Some("abc123"));
        assert!(pull.merged_at.is_some());
        let comments = loaded.list_comments(issue.id).await.unwrap();
        assert_eq!(comments[0].kind, CommentKind::Merged);
    }

    #[test]
    fn test_file_contains_header_comment() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(STATE_FILE);
        save_state(&path, &StoreState::new()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# forkpull state"));
        assert!(content.contains("Auto-generated"));
    }

    #[test]
    fn test_newer_version_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(STATE_FILE);
        fs::write(&path, "version = 99\n").unwrap();

        let err = load_state(&path).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }
}
