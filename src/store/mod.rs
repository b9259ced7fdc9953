//! Collaborator stores for repositories, issues and pull requests
//!
//! The engine only talks to these traits. [`MemoryStore`] implements both
//! and can be persisted to a TOML state file with [`load_state`] /
//! [`save_state`].

mod memory;
mod storage;

pub use memory::{MemoryStore, STATE_VERSION, StoreState};
pub use storage::{load_state, save_state, state_path};

use crate::error::Result;
use crate::types::{
    Comment, CommentKind, CreateOutcome, Issue, IssueId, IssueState, NewIssue, PullKey, PullRequest, RepoId,
    Repository,
};
use async_trait::async_trait;

/// Repository lookups and the fork relationship
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Repository by ID (`NotFound` when absent)
    async fn get_repository(&self, id: RepoId) -> Result<Repository>;

    /// Repository by `owner/name`, case-insensitive (`NotFound` when absent)
    async fn find_repository(&self, owner: &str, name: &str) -> Result<Repository>;

    /// Fork of `upstream_id` owned by `owner`, if any
    async fn lookup_fork(&self, upstream_id: RepoId, owner: &str) -> Result<Option<Repository>>;
}

/// Issue threads and the pull request records bound to them
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Create an issue flagged as a pull request together with its record
    ///
    /// The issue takes the repository's next issue index. If a pull request
    /// for `key` is still open it is returned as `AlreadyExists` instead; the
    /// check and the insert must be atomic.
    async fn create_pull(&self, issue: NewIssue, key: PullKey) -> Result<CreateOutcome>;

    /// Issue by global ID
    async fn get_issue(&self, id: IssueId) -> Result<Issue>;

    /// Issue by per-repository index
    async fn get_issue_by_index(&self, repo_id: RepoId, index: u64) -> Result<Issue>;

    /// Pull request record owned by an issue
    async fn get_pull_by_issue(&self, issue_id: IssueId) -> Result<PullRequest>;

    /// Pull request for `key` whose issue is still open
    async fn find_open_pull(&self, key: &PullKey) -> Result<Option<PullRequest>>;

    /// Append to an issue thread
    async fn append_comment(
        &self,
        issue_id: IssueId,
        kind: CommentKind,
        poster: &str,
        content: &str,
    ) -> Result<Comment>;

    /// Thread entries in posting order
    async fn list_comments(&self, issue_id: IssueId) -> Result<Vec<Comment>>;

    /// Change an issue's state
    async fn set_issue_state(&self, issue_id: IssueId, state: IssueState) -> Result<()>;

    /// Record merge metadata on a pull request
    async fn record_merge(
        &self,
        pull_id: u64,
        merged_commit: &str,
        merged_by: &str,
    ) -> Result<PullRequest>;
}
