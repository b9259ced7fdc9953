//! Fast-forward merge execution - effectful operations
//!
//! The upstream repository is only ever touched by the final push. All other
//! work happens in a throwaway clone inside a private workspace, which is
//! removed whether the attempt succeeds or fails.

use crate::config::EngineConfig;
use crate::error::{Error, MergeStage, Result};
use crate::git::{GitCommand, Workspace};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Remote name the fork is registered under inside the workspace clone
const FORK_REMOTE: &str = "pr";

/// Directory of the clone inside the workspace
const CLONE_DIR: &str = "repo";

/// Result of a successful merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Target tip before the merge
    pub previous_tip: String,
    /// Target tip after the merge (the source tip)
    pub merged_tip: String,
}

impl MergeOutcome {
    /// Whether the target branch actually moved
    pub fn advanced(&self) -> bool {
        self.previous_tip != self.merged_tip
    }
}

/// Fast-forward `target_branch` of the upstream to `source_branch` of the fork
///
/// Protocol:
/// 1. create a unique workspace
/// 2. clone the upstream target branch into it
/// 3. register the fork as remote `pr`
/// 4. fetch the source branch and fast-forward onto it (divergence is
///    `NonMergeable`)
/// 5. push back with a compare-and-swap on the target ref
/// 6. remove the workspace, always
///
/// A failure in steps 2-5 is `MergeFailed` naming the step and carrying
/// git's stderr. Cleanup failures are logged and never replace the result.
pub async fn merge(
    target_branch: &str,
    source_branch: &str,
    target_repo_path: &Path,
    source_repo_path: &Path,
    config: &EngineConfig,
) -> Result<MergeOutcome> {
    let workspace = Workspace::create(&config.workspace_root, "merge")?;
    debug!(
        workspace = %workspace.path().display(),
        target = %target_repo_path.display(),
        source = %source_repo_path.display(),
        "starting merge"
    );

    let result = run_steps(
        workspace.path(),
        target_branch,
        source_branch,
        target_repo_path,
        source_repo_path,
        config.command_timeout,
    )
    .await;

    workspace.discard();

    match &result {
        Ok(outcome) => info!(
            target_branch,
            source_branch,
            from = %outcome.previous_tip,
            to = %outcome.merged_tip,
            "merged"
        ),
        Err(e) => debug!(target_branch, source_branch, error = %e, "merge attempt failed"),
    }
    result
}

async fn run_steps(
    workspace: &Path,
    target_branch: &str,
    source_branch: &str,
    target_repo_path: &Path,
    source_repo_path: &Path,
    timeout: Duration,
) -> Result<MergeOutcome> {
    let clone_dir = workspace.join(CLONE_DIR);
    let in_clone = || GitCommand::new(&clone_dir, timeout);

    // 2. clone
    GitCommand::new(workspace, timeout)
        .args(["clone", "-q", "--no-tags", "-b", target_branch])
        .arg(target_repo_path)
        .arg(CLONE_DIR)
        .run()
        .await
        .map_err(|e| e.at_stage(MergeStage::Clone))?;
    let previous_tip = rev_parse(in_clone(), "HEAD")
        .await
        .map_err(|e| e.at_stage(MergeStage::Clone))?;

    // 3. remote
    in_clone()
        .args(["remote", "add", FORK_REMOTE])
        .arg(source_repo_path)
        .run()
        .await
        .map_err(|e| e.at_stage(MergeStage::AddRemote))?;

    // 4. fetch + fast-forward only
    fast_forward(&in_clone, target_branch, source_branch)
        .await
        .map_err(|e| e.at_stage(MergeStage::FastForward))?;
    let merged_tip = rev_parse(in_clone(), "HEAD")
        .await
        .map_err(|e| e.at_stage(MergeStage::FastForward))?;

    // 5. push, succeeding only if the upstream ref still holds previous_tip
    in_clone()
        .args(["push", "-q", "--no-verify"])
        .arg(format!(
            "--force-with-lease=refs/heads/{target_branch}:{previous_tip}"
        ))
        .arg("origin")
        .arg(format!("HEAD:refs/heads/{target_branch}"))
        .run()
        .await
        .map_err(|e| e.at_stage(MergeStage::Push))?;

    Ok(MergeOutcome {
        previous_tip,
        merged_tip,
    })
}

async fn fast_forward(
    in_clone: &impl Fn() -> GitCommand,
    target_branch: &str,
    source_branch: &str,
) -> Result<()> {
    in_clone()
        .args(["fetch", "-q", "--no-tags", FORK_REMOTE])
        .arg(format!("refs/heads/{source_branch}"))
        .run()
        .await?;

    let is_ff = in_clone()
        .args(["merge-base", "--is-ancestor", "HEAD", "FETCH_HEAD"])
        .check()
        .await?;
    if !is_ff {
        return Err(Error::NonMergeable {
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
        });
    }

    in_clone()
        .args(["merge", "--ff-only", "-q", "FETCH_HEAD"])
        .run()
        .await?;
    Ok(())
}

async fn rev_parse(cmd: GitCommand, rev: &str) -> Result<String> {
    let out = cmd.args(["rev-parse", "--verify"]).arg(rev).run().await?;
    Ok(out.trim().to_string())
}
