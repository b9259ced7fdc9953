//! Error types for forkpull

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Step of the merge protocol that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStage {
    /// Cloning the upstream target branch into the workspace
    Clone,
    /// Registering the fork as an extra remote
    AddRemote,
    /// Fetching the source branch and fast-forwarding onto it
    FastForward,
    /// Pushing the advanced branch back to the upstream repository
    Push,
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => write!(f, "git clone"),
            Self::AddRemote => write!(f, "git remote"),
            Self::FastForward => write!(f, "git pull"),
            Self::Push => write!(f, "git push"),
        }
    }
}

/// Errors produced by the diff and merge engine
#[derive(Debug, Error)]
pub enum Error {
    /// Repository, branch, blob or fork could not be resolved
    #[error("not found: {0}")]
    NotFound(String),

    /// `owner:branch` token could not be parsed
    #[error("invalid branch reference '{0}': expected owner:branch")]
    InvalidBranchRef(String),

    /// Diff computation failed
    #[error("diff unavailable: {0}")]
    DiffUnavailable(String),

    /// Source history diverged from the target branch
    #[error("'{source_branch}' cannot be fast-forwarded onto '{target_branch}'")]
    NonMergeable {
        /// Branch in the fork
        source_branch: String,
        /// Branch in the upstream repository
        target_branch: String,
    },

    /// A step of the merge protocol failed
    #[error("merge failed at {stage}: {message}")]
    MergeFailed {
        /// Step that failed
        stage: MergeStage,
        /// Diagnostic text from git
        message: String,
    },

    /// Operation not allowed in the pull request's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// External command exceeded its time budget
    #[error("'{command}' timed out after {timeout:?}")]
    Timeout {
        /// Command line that was running
        command: String,
        /// Budget that was exceeded
        timeout: Duration,
    },

    /// git reported an error outside of a merge step
    #[error("git error: {0}")]
    Git(String),

    /// Issue or repository store failure
    #[error("store error: {0}")]
    Store(String),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),

    /// Internal error (task join failures, prompts)
    #[error("internal error: {0}")]
    Internal(String),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a normal negative result rather than a failure
    ///
    /// The UI uses this to disable the merge action instead of reporting
    /// an error page.
    pub const fn is_informational(&self) -> bool {
        matches!(self, Self::NonMergeable { .. })
    }

    /// Whether the error maps to a user-facing "not found"
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Turn a step failure into a `MergeFailed`, leaving other kinds intact
    pub(crate) fn at_stage(self, stage: MergeStage) -> Self {
        match self {
            Self::Git(message) => Self::MergeFailed { stage, message },
            Self::Timeout { .. } | Self::Io(_) => Self::MergeFailed {
                stage,
                message: self.to_string(),
            },
            other => other,
        }
    }
}

/// Result type alias for forkpull operations
pub type Result<T> = std::result::Result<T, Error>;
