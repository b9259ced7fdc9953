//! In-process store backing both collaborator traits

use super::{IssueStore, RepositoryStore};
use crate::error::{Error, Result};
use crate::types::{
    Comment, CommentKind, CreateOutcome, Issue, IssueId, IssueState, NewIssue, PullKey, PullRequest, RepoId,
    Repository,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

/// Everything the store holds; serialized as the state file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    /// Format version
    #[serde(default)]
    pub version: u32,
    /// Last assigned ID, shared by all record kinds
    #[serde(default)]
    pub last_id: u64,
    /// Registered repositories
    #[serde(default)]
    pub repositories: Vec<Repository>,
    /// Issues, including pull request issues
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Pull request records
    #[serde(default)]
    pub pulls: Vec<PullRequest>,
    /// Thread entries in posting order
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl StoreState {
    /// Empty state at the current version
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            ..Self::default()
        }
    }

    const fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Open pull request for `key` together with its issue
    fn open_pull(&self, key: &PullKey) -> Option<(&Issue, &PullRequest)> {
        self.pulls.iter().filter(|p| &p.key == key).find_map(|p| {
            self.issues
                .iter()
                .find(|i| i.id == p.issue_id && i.state == IssueState::Open)
                .map(|i| (i, p))
        })
    }

    fn issue_mut(&mut self, id: IssueId) -> Result<&mut Issue> {
        self.issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::NotFound(format!("issue {id}")))
    }
}

/// Mutex-guarded [`StoreState`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::from_state(StoreState::new())
    }

    /// Store seeded with previously saved state
    pub const fn from_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Copy of the current state, for persisting
    pub fn snapshot(&self) -> Result<StoreState> {
        Ok(self.lock()?.clone())
    }

    /// Register a repository
    ///
    /// Fails if `owner/name` is taken or `fork_parent` is unknown.
    pub fn add_repository(
        &self,
        owner: &str,
        name: &str,
        fork_parent: Option<RepoId>,
    ) -> Result<Repository> {
        let mut state = self.lock()?;
        if state
            .repositories
            .iter()
            .any(|r| r.is_owned_by(owner) && r.name.eq_ignore_ascii_case(name))
        {
            return Err(Error::Store(format!("repository {owner}/{name} already exists")));
        }
        if let Some(parent) = fork_parent {
            if !state.repositories.iter().any(|r| r.id == parent) {
                return Err(Error::NotFound(format!("repository {parent}")));
            }
        }
        let repo = Repository {
            id: state.next_id(),
            owner: owner.to_string(),
            name: name.to_string(),
            fork_parent,
        };
        state.repositories.push(repo.clone());
        Ok(repo)
    }

    /// All registered repositories
    pub fn repositories(&self) -> Result<Vec<Repository>> {
        Ok(self.lock()?.repositories.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn get_repository(&self, id: RepoId) -> Result<Repository> {
        self.lock()?
            .repositories
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("repository {id}")))
    }

    async fn find_repository(&self, owner: &str, name: &str) -> Result<Repository> {
        self.lock()?
            .repositories
            .iter()
            .find(|r| r.is_owned_by(owner) && r.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("repository {owner}/{name}")))
    }

    async fn lookup_fork(&self, upstream_id: RepoId, owner: &str) -> Result<Option<Repository>> {
        Ok(self
            .lock()?
            .repositories
            .iter()
            .find(|r| r.fork_parent == Some(upstream_id) && r.is_owned_by(owner))
            .cloned())
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn create_pull(&self, issue: NewIssue, key: PullKey) -> Result<CreateOutcome> {
        let mut state = self.lock()?;
        if let Some((existing, pull)) = state.open_pull(&key) {
            return Ok(CreateOutcome::AlreadyExists(existing.clone(), pull.clone()));
        }
        let index = state
            .issues
            .iter()
            .filter(|i| i.repo_id == issue.repo_id)
            .map(|i| i.index)
            .max()
            .unwrap_or(0)
            + 1;
        let issue = Issue {
            id: state.next_id(),
            repo_id: issue.repo_id,
            index,
            title: issue.title,
            content: issue.content,
            poster: issue.poster,
            is_pull: issue.is_pull,
            state: IssueState::Open,
            created_at: Utc::now(),
        };
        let pull = PullRequest {
            id: state.next_id(),
            issue_id: issue.id,
            key,
            merged_commit: None,
            merged_by: None,
            merged_at: None,
        };
        state.issues.push(issue.clone());
        state.pulls.push(pull.clone());
        Ok(CreateOutcome::Created(issue, pull))
    }

    async fn get_issue(&self, id: IssueId) -> Result<Issue> {
        self.lock()?
            .issues
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("issue {id}")))
    }

    async fn get_issue_by_index(&self, repo_id: RepoId, index: u64) -> Result<Issue> {
        self.lock()?
            .issues
            .iter()
            .find(|i| i.repo_id == repo_id && i.index == index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("issue #{index} in repository {repo_id}")))
    }

    async fn get_pull_by_issue(&self, issue_id: IssueId) -> Result<PullRequest> {
        self.lock()?
            .pulls
            .iter()
            .find(|p| p.issue_id == issue_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("pull request for issue {issue_id}")))
    }

    async fn find_open_pull(&self, key: &PullKey) -> Result<Option<PullRequest>> {
        Ok(self.lock()?.open_pull(key).map(|(_, p)| p.clone()))
    }

    async fn append_comment(
        &self,
        issue_id: IssueId,
        kind: CommentKind,
        poster: &str,
        content: &str,
    ) -> Result<Comment> {
        let mut state = self.lock()?;
        state.issue_mut(issue_id)?;
        let comment = Comment {
            id: state.next_id(),
            issue_id,
            kind,
            poster: poster.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, issue_id: IssueId) -> Result<Vec<Comment>> {
        Ok(self
            .lock()?
            .comments
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect())
    }

    async fn set_issue_state(&self, issue_id: IssueId, state: IssueState) -> Result<()> {
        self.lock()?.issue_mut(issue_id)?.state = state;
        Ok(())
    }

    async fn record_merge(
        &self,
        pull_id: u64,
        merged_commit: &str,
        merged_by: &str,
    ) -> Result<PullRequest> {
        let mut state = self.lock()?;
        let pull = state
            .pulls
            .iter_mut()
            .find(|p| p.id == pull_id)
            .ok_or_else(|| Error::NotFound(format!("pull request {pull_id}")))?;
        pull.merged_commit = Some(merged_commit.to_string());
        pull.merged_by = Some(merged_by.to_string());
        pull.merged_at = Some(Utc::now());
        Ok(pull.clone())
    }
}
