//! Core types for forkpull

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Repository identifier
pub type RepoId = u64;

/// Issue identifier (global, not the per-repository index)
pub type IssueId = u64;

/// A hosted repository, possibly a fork of another one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    /// Repository ID
    pub id: RepoId,
    /// Owner (user or organization) name
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Repository this one was forked from
    pub fork_parent: Option<RepoId>,
}

impl Repository {
    /// On-disk location of the object store under `root`
    ///
    /// Derived from identity only, so it never changes while the repository
    /// exists.
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(self.owner.to_lowercase())
            .join(format!("{}.git", self.name.to_lowercase()))
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Whether `owner` names this repository's owner
    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner)
    }
}

/// Branch in a specific repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Repository holding the branch
    pub repo: Repository,
    /// Branch name (without `refs/heads/`)
    pub branch: String,
}

/// Issue / pull request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Open and accepting transitions
    Open,
    /// Closed without merging
    Closed,
    /// Merged (pull requests only)
    Merged,
}

impl IssueState {
    /// Whether no further transitions are allowed
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// An issue; pull requests borrow its numbering and comment thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Global issue ID
    pub id: IssueId,
    /// Repository the issue belongs to
    pub repo_id: RepoId,
    /// Per-repository number shown to users
    pub index: u64,
    /// Title
    pub title: String,
    /// Description body
    pub content: String,
    /// User who opened it
    pub poster: String,
    /// Whether this issue is a pull request
    pub is_pull: bool,
    /// Current state
    pub state: IssueState,
    /// When the issue was opened
    pub created_at: DateTime<Utc>,
}

/// Fields needed to open an issue
#[derive(Debug, Clone)]
pub struct NewIssue {
    /// Repository the issue belongs to
    pub repo_id: RepoId,
    /// Title
    pub title: String,
    /// Description body
    pub content: String,
    /// User who opened it
    pub poster: String,
    /// Whether this issue is a pull request
    pub is_pull: bool,
}

/// Kind of entry in an issue thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// Plain comment
    Comment,
    /// Close action
    Close,
    /// Merge action (recorded before the merge runs)
    Merged,
}

impl std::fmt::Display for CommentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comment => write!(f, "comment"),
            Self::Close => write!(f, "close"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Entry in an issue thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID
    pub id: u64,
    /// Issue this comment belongs to
    pub issue_id: IssueId,
    /// Kind of entry
    pub kind: CommentKind,
    /// Author
    pub poster: String,
    /// Comment body text
    pub content: String,
    /// When the comment was posted
    pub created_at: DateTime<Utc>,
}

/// Key identifying the branch pair a pull request proposes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullKey {
    /// Fork (source) repository
    pub from_repo_id: RepoId,
    /// Source branch
    pub from_branch: String,
    /// Upstream (target) repository
    pub to_repo_id: RepoId,
    /// Target branch
    pub to_branch: String,
}

/// A pull request record
///
/// Carries no content of its own; title, body and comments live on the
/// owning issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Pull request ID
    pub id: u64,
    /// Owning issue
    pub issue_id: IssueId,
    /// Branch pair
    pub key: PullKey,
    /// Target tip after a successful merge
    pub merged_commit: Option<String>,
    /// User who merged it
    pub merged_by: Option<String>,
    /// When it was merged
    pub merged_at: Option<DateTime<Utc>>,
}

/// Commit metadata for the pull request commit list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitSummary {
    /// Full commit ID (hex)
    pub id: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// First line of the commit message
    pub summary: String,
    /// When the commit was authored
    pub authored_at: DateTime<Utc>,
}

/// Outcome of a create request
///
/// At most one open pull request exists per [`PullKey`]; a second request for
/// the same pair gets the existing record back.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// A new pull request was recorded
    Created(Issue, PullRequest),
    /// An open request already covers the same branch pair
    AlreadyExists(Issue, PullRequest),
}

impl CreateOutcome {
    /// The pull request either way
    pub const fn pull(&self) -> &PullRequest {
        match self {
            Self::Created(_, pull) | Self::AlreadyExists(_, pull) => pull,
        }
    }

    /// The backing issue either way
    pub const fn issue(&self) -> &Issue {
        match self {
            Self::Created(issue, _) | Self::AlreadyExists(issue, _) => issue,
        }
    }

    /// Whether a new record was created
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(..))
    }
}
