//! forkpull - cross-repository pull request diff and merge engine
//!
//! Compares a branch in a fork against a branch in its upstream repository,
//! checks whether the fork branch can be fast-forwarded onto the upstream
//! branch, and performs that fast-forward through a disposable clone so the
//! upstream is only touched by a single compare-and-swap push.

pub mod compare;
pub mod config;
pub mod diff;
pub mod error;
pub mod forks;
pub mod git;
pub mod merge;
pub mod pulls;
pub mod repo;
pub mod store;
pub mod types;

pub use compare::{can_fast_forward, list_commits};
pub use config::EngineConfig;
pub use diff::{DiffResult, compute_forked_diff};
pub use error::{Error, Result};
pub use merge::{MergeOutcome, merge};
pub use pulls::{CreateOutcome, NewPullRequest, PullRequestService};
pub use repo::RepoHandle;
