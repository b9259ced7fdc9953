//! Recording store for lifecycle tests
//!
//! Wraps a [`MemoryStore`] so tests get real bookkeeping while still being
//! able to inspect calls and inject failures.

#![allow(dead_code)]

use async_trait::async_trait;
use forkpull::error::{Error, Result};
use forkpull::store::{IssueStore, MemoryStore, RepositoryStore};
use forkpull::types::{
    Comment, CommentKind, CreateOutcome, Issue, IssueId, IssueState, NewIssue, PullKey, PullRequest, RepoId,
    Repository,
};
use std::sync::Mutex;

/// Call record for `append_comment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendCommentCall {
    pub issue_id: IssueId,
    pub kind: CommentKind,
    pub poster: String,
}

/// Call record for `record_merge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMergeCall {
    pub pull_id: u64,
    pub merged_commit: String,
    pub merged_by: String,
}

/// Store wrapper with call tracking and error injection
///
/// Features:
/// - Delegates to an inner `MemoryStore`
/// - Records mutating calls in order
/// - Error injection for failure path testing
pub struct RecordingStore {
    inner: MemoryStore,
    // Call tracking
    create_pull_calls: Mutex<Vec<PullKey>>,
    append_comment_calls: Mutex<Vec<AppendCommentCall>>,
    set_state_calls: Mutex<Vec<(IssueId, IssueState)>>,
    record_merge_calls: Mutex<Vec<RecordMergeCall>>,
    // Error injection
    error_on_create_pull: Mutex<Option<String>>,
    error_on_append_comment: Mutex<Option<String>>,
    error_on_record_merge: Mutex<Option<String>>,
}

impl RecordingStore {
    /// Wrap an existing store
    pub fn wrap(inner: MemoryStore) -> Self {
        Self {
            inner,
            create_pull_calls: Mutex::new(Vec::new()),
            append_comment_calls: Mutex::new(Vec::new()),
            set_state_calls: Mutex::new(Vec::new()),
            record_merge_calls: Mutex::new(Vec::new()),
            error_on_create_pull: Mutex::new(None),
            error_on_append_comment: Mutex::new(None),
            error_on_record_merge: Mutex::new(None),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    // === Error injection methods ===

    /// Make `create_pull` return an error
    pub fn fail_create_pull(&self, msg: &str) {
        *self.error_on_create_pull.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `append_comment` return an error
    pub fn fail_append_comment(&self, msg: &str) {
        *self.error_on_append_comment.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `record_merge` return an error
    pub fn fail_record_merge(&self, msg: &str) {
        *self.error_on_record_merge.lock().unwrap() = Some(msg.to_string());
    }

    // === Call inspection methods ===

    /// Keys passed to `create_pull`
    pub fn create_pull_calls(&self) -> Vec<PullKey> {
        self.create_pull_calls.lock().unwrap().clone()
    }

    /// Calls to `append_comment`
    pub fn append_comment_calls(&self) -> Vec<AppendCommentCall> {
        self.append_comment_calls.lock().unwrap().clone()
    }

    /// Calls to `set_issue_state`
    pub fn set_state_calls(&self) -> Vec<(IssueId, IssueState)> {
        self.set_state_calls.lock().unwrap().clone()
    }

    /// Calls to `record_merge`
    pub fn record_merge_calls(&self) -> Vec<RecordMergeCall> {
        self.record_merge_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryStore for RecordingStore {
    async fn get_repository(&self, id: RepoId) -> Result<Repository> {
        self.inner.get_repository(id).await
    }

    async fn find_repository(&self, owner: &str, name: &str) -> Result<Repository> {
        self.inner.find_repository(owner, name).await
    }

    async fn lookup_fork(&self, upstream_id: RepoId, owner: &str) -> Result<Option<Repository>> {
        self.inner.lookup_fork(upstream_id, owner).await
    }
}

#[async_trait]
impl IssueStore for RecordingStore {
    async fn create_pull(&self, issue: NewIssue, key: PullKey) -> Result<CreateOutcome> {
        self.create_pull_calls.lock().unwrap().push(key.clone());
        if let Some(msg) = self.error_on_create_pull.lock().unwrap().clone() {
            return Err(Error::Store(msg));
        }
        self.inner.create_pull(issue, key).await
    }

    async fn get_issue(&self, id: IssueId) -> Result<Issue> {
        self.inner.get_issue(id).await
    }

    async fn get_issue_by_index(&self, repo_id: RepoId, index: u64) -> Result<Issue> {
        self.inner.get_issue_by_index(repo_id, index).await
    }

    async fn get_pull_by_issue(&self, issue_id: IssueId) -> Result<PullRequest> {
        self.inner.get_pull_by_issue(issue_id).await
    }

    async fn find_open_pull(&self, key: &PullKey) -> Result<Option<PullRequest>> {
        self.inner.find_open_pull(key).await
    }

    async fn append_comment(
        &self,
        issue_id: IssueId,
        kind: CommentKind,
        poster: &str,
        content: &str,
    ) -> Result<Comment> {
        self.append_comment_calls
            .lock()
            .unwrap()
            .push(AppendCommentCall {
                issue_id,
                kind,
                poster: poster.to_string(),
            });
        if let Some(msg) = self.error_on_append_comment.lock().unwrap().clone() {
            return Err(Error::Store(msg));
        }
        self.inner
            .append_comment(issue_id, kind, poster, content)
            .await
    }

    async fn list_comments(&self, issue_id: IssueId) -> Result<Vec<Comment>> {
        self.inner.list_comments(issue_id).await
    }

    async fn set_issue_state(&self, issue_id: IssueId, state: IssueState) -> Result<()> {
        self.set_state_calls.lock().unwrap().push((issue_id, state));
        self.inner.set_issue_state(issue_id, state).await
    }

    async fn record_merge(
        &self,
        pull_id: u64,
        merged_commit: &str,
        merged_by: &str,
    ) -> Result<PullRequest> {
        self.record_merge_calls
            .lock()
            .unwrap()
            .push(RecordMergeCall {
                pull_id,
                merged_commit: merged_commit.to_string(),
                merged_by: merged_by.to_string(),
            });
        if let Some(msg) = self.error_on_record_merge.lock().unwrap().clone() {
            return Err(Error::Store(msg));
        }
        self.inner
            .record_merge(pull_id, merged_commit, merged_by)
            .await
    }
}
