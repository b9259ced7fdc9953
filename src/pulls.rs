//! Pull request lifecycle
//!
//! ```text
//! Open ──close──▶ Closed
//!   │
//!   └──merge (executor succeeded)──▶ Merged
//! ```
//!
//! Both end states are terminal. A merge action records its comment before
//! the executor runs; if the executor fails the comment stays as the audit
//! trail and the pull request stays open.

use crate::compare::{can_fast_forward, list_commits};
use crate::config::EngineConfig;
use crate::diff::{DiffResult, compute_forked_diff};
use crate::error::{Error, Result};
use crate::forks::resolve_branch_ref;
use crate::merge::{MergeOutcome, merge};
use crate::repo::resolve_tip;
use crate::store::{IssueStore, RepositoryStore};
pub use crate::types::CreateOutcome;
use crate::types::{
    Comment, CommentKind, CommitSummary, Issue, IssueState, NewIssue, PullKey, PullRequest,
    Repository,
};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Form submitted to open a pull request
#[derive(Debug, Clone)]
pub struct NewPullRequest {
    /// Source as `owner:branch`
    pub from: String,
    /// Target as `owner:branch`
    pub to: String,
    /// Title of the backing issue
    pub title: String,
    /// Description of the backing issue
    pub description: String,
    /// User opening the request
    pub poster: String,
}

/// A pull request with its repositories resolved
#[derive(Debug, Clone)]
pub struct ResolvedPull {
    /// Backing issue
    pub issue: Issue,
    /// Pull request record
    pub pull: PullRequest,
    /// Fork the changes come from
    pub from_repo: Repository,
    /// Repository receiving the changes
    pub to_repo: Repository,
}

/// Everything shown on a pull request page
#[derive(Debug, Clone)]
pub struct PullView {
    /// The pull request
    pub resolved: ResolvedPull,
    /// Issue thread
    pub comments: Vec<Comment>,
    /// Commits the merge would bring in, newest first
    pub commits: Vec<CommitSummary>,
    /// Bounded change set
    pub diff: DiffResult,
    /// Whether a fast-forward merge is possible
    pub mergeable: bool,
}

/// Pull request operations over the collaborator stores
///
/// Holds no state of its own; configuration is passed in explicitly.
pub struct PullRequestService<'a> {
    repos: &'a dyn RepositoryStore,
    issues: &'a dyn IssueStore,
    config: &'a EngineConfig,
}

impl<'a> PullRequestService<'a> {
    /// Create a service over the given stores
    pub const fn new(
        repos: &'a dyn RepositoryStore,
        issues: &'a dyn IssueStore,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            repos,
            issues,
            config,
        }
    }

    fn repo_path(&self, repo: &Repository) -> PathBuf {
        repo.path(&self.config.repo_root)
    }

    /// Open a pull request against `upstream`
    ///
    /// Both branches must exist. An open request for the same branch pair is
    /// returned as `AlreadyExists` instead of creating a duplicate, also when
    /// two requests race.
    pub async fn create_pull_request(
        &self,
        upstream: &Repository,
        form: NewPullRequest,
    ) -> Result<CreateOutcome> {
        let from = resolve_branch_ref(self.repos, upstream, &form.from).await?;
        let to = resolve_branch_ref(self.repos, upstream, &form.to).await?;

        let key = PullKey {
            from_repo_id: from.repo.id,
            from_branch: from.branch.clone(),
            to_repo_id: to.repo.id,
            to_branch: to.branch.clone(),
        };

        resolve_tip(&self.repo_path(&from.repo), &from.branch).await?;
        resolve_tip(&self.repo_path(&to.repo), &to.branch).await?;

        // The store checks for an open request and inserts under one lock.
        let outcome = self
            .issues
            .create_pull(
                NewIssue {
                    repo_id: upstream.id,
                    title: form.title,
                    content: form.description,
                    poster: form.poster,
                    is_pull: true,
                },
                key,
            )
            .await?;
        match &outcome {
            CreateOutcome::Created(issue, pull) => {
                debug!(pull = pull.id, index = issue.index, "created pull request");
            }
            CreateOutcome::AlreadyExists(_, pull) => {
                debug!(pull = pull.id, "open pull request already exists");
            }
        }
        Ok(outcome)
    }

    /// Look up pull request `#index` of `repo` and its repositories
    pub async fn resolve(&self, repo: &Repository, index: u64) -> Result<ResolvedPull> {
        let issue = self.issues.get_issue_by_index(repo.id, index).await?;
        if !issue.is_pull {
            return Err(Error::NotFound(format!(
                "pull request #{index} in {}",
                repo.full_name()
            )));
        }
        let pull = self.issues.get_pull_by_issue(issue.id).await?;
        let from_repo = self.repos.get_repository(pull.key.from_repo_id).await?;
        let to_repo = self.repos.get_repository(pull.key.to_repo_id).await?;
        Ok(ResolvedPull {
            issue,
            pull,
            from_repo,
            to_repo,
        })
    }

    /// Bounded diff of the pull request
    pub async fn render_diff(&self, repo: &Repository, index: u64) -> Result<DiffResult> {
        let r = self.resolve(repo, index).await?;
        self.diff_of(&r).await
    }

    async fn diff_of(&self, r: &ResolvedPull) -> Result<DiffResult> {
        compute_forked_diff(
            &self.repo_path(&r.to_repo),
            &self.repo_path(&r.from_repo),
            &r.pull.key.to_branch,
            &r.pull.key.from_branch,
            self.config.max_diff_lines,
            self.config,
        )
        .await
    }

    /// Whether the pull request can be merged by fast-forward
    pub async fn check_mergeable(&self, repo: &Repository, index: u64) -> Result<bool> {
        let r = self.resolve(repo, index).await?;
        self.mergeable_of(&r).await
    }

    async fn mergeable_of(&self, r: &ResolvedPull) -> Result<bool> {
        can_fast_forward(
            &self.repo_path(&r.to_repo),
            &self.repo_path(&r.from_repo),
            &r.pull.key.to_branch,
            &r.pull.key.from_branch,
            self.config,
        )
        .await
    }

    /// Pull request page: thread, commits, diff and mergeability
    pub async fn view(&self, repo: &Repository, index: u64) -> Result<PullView> {
        let resolved = self.resolve(repo, index).await?;
        let comments = self.issues.list_comments(resolved.issue.id).await?;
        let commits = list_commits(
            &self.repo_path(&resolved.to_repo),
            &self.repo_path(&resolved.from_repo),
            &resolved.pull.key.to_branch,
            &resolved.pull.key.from_branch,
            self.config,
        )
        .await?;
        let diff = self.diff_of(&resolved).await?;
        let mergeable = self.mergeable_of(&resolved).await?;
        Ok(PullView {
            resolved,
            comments,
            commits,
            diff,
            mergeable,
        })
    }

    /// Add a comment; the state is unchanged
    pub async fn comment_on_pull_request(
        &self,
        repo: &Repository,
        index: u64,
        poster: &str,
        content: &str,
    ) -> Result<Comment> {
        let r = self.resolve(repo, index).await?;
        self.issues
            .append_comment(r.issue.id, CommentKind::Comment, poster, content)
            .await
    }

    /// Close without merging
    pub async fn close_pull_request(
        &self,
        repo: &Repository,
        index: u64,
        poster: &str,
        content: &str,
    ) -> Result<Comment> {
        let r = self.resolve(repo, index).await?;
        ensure_open(&r.issue)?;
        let comment = self
            .issues
            .append_comment(r.issue.id, CommentKind::Close, poster, content)
            .await?;
        self.issues
            .set_issue_state(r.issue.id, IssueState::Closed)
            .await?;
        Ok(comment)
    }

    /// Merge by fast-forwarding the target branch
    ///
    /// The merge comment is appended first and kept even if the merge fails.
    /// A store error after the push is returned as is, but the target branch
    /// has already moved by then and is not rolled back.
    pub async fn merge_pull_request(
        &self,
        repo: &Repository,
        index: u64,
        poster: &str,
        content: &str,
    ) -> Result<MergeOutcome> {
        let r = self.resolve(repo, index).await?;
        ensure_open(&r.issue)?;
        self.issues
            .append_comment(r.issue.id, CommentKind::Merged, poster, content)
            .await?;

        let outcome = merge(
            &r.pull.key.to_branch,
            &r.pull.key.from_branch,
            &self.repo_path(&r.to_repo),
            &self.repo_path(&r.from_repo),
            self.config,
        )
        .await?;

        let recorded = match self
            .issues
            .record_merge(r.pull.id, &outcome.merged_tip, poster)
            .await
        {
            Ok(_) => {
                self.issues
                    .set_issue_state(r.issue.id, IssueState::Merged)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = recorded {
            warn!(
                pull = r.pull.id,
                merged_tip = %outcome.merged_tip,
                error = %e,
                "target branch was pushed but the merge could not be recorded"
            );
            return Err(e);
        }
        Ok(outcome)
    }
}

fn ensure_open(issue: &Issue) -> Result<()> {
    if issue.state.is_terminal() {
        return Err(Error::InvalidState(format!(
            "pull request #{} is already {}",
            issue.index, issue.state
        )));
    }
    Ok(())
}
