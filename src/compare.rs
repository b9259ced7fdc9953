//! Cross-repository comparison context and the mergeability check
//!
//! Two physically distinct object stores are compared inside a scratch bare
//! repository that borrows both stores through `objects/info/alternates`.
//! No objects are copied and no ref in either store is written; the scratch
//! repository is removed when the comparison ends.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::git::{GitCommand, Workspace};
use crate::repo::{ObjectId, resolve_tip_and_objects};
use crate::types::CommitSummary;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Well-known id of the empty tree, used as the base of unrelated histories
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

const FIELD_SEP: char = '\x1f';

/// Scratch repository that can see both the target and the source store
#[derive(Debug)]
pub struct CompareContext {
    workspace: Workspace,
    target_tip: ObjectId,
    source_tip: ObjectId,
    timeout: Duration,
}

impl CompareContext {
    /// Resolve both branch tips and register both stores
    pub async fn prepare(
        target_repo_path: &Path,
        source_repo_path: &Path,
        target_branch: &str,
        source_branch: &str,
        config: &EngineConfig,
    ) -> Result<Self> {
        let (target_tip, target_objects) =
            resolve_tip_and_objects(target_repo_path, target_branch).await?;
        let (source_tip, source_objects) =
            resolve_tip_and_objects(source_repo_path, source_branch).await?;

        let workspace = Workspace::create(&config.workspace_root, "compare")?;
        let ctx = Self {
            workspace,
            target_tip,
            source_tip,
            timeout: config.command_timeout,
        };

        ctx.git()
            .args(["init", "--bare", "-q", "."])
            .run()
            .await?;
        let alternates = format!(
            "{}\n{}\n",
            source_objects.display(),
            target_objects.display()
        );
        fs::write(
            ctx.workspace.path().join("objects/info/alternates"),
            alternates,
        )?;

        Ok(ctx)
    }

    /// Target branch tip
    pub const fn target_tip(&self) -> ObjectId {
        self.target_tip
    }

    /// Source branch tip
    pub const fn source_tip(&self) -> ObjectId {
        self.source_tip
    }

    fn git(&self) -> GitCommand {
        GitCommand::new(self.workspace.path(), self.timeout)
    }

    /// Most recent common ancestor, or `None` for unrelated histories
    pub async fn merge_base(&self) -> Result<Option<String>> {
        let output = self
            .git()
            .arg("merge-base")
            .arg(self.target_tip.to_string())
            .arg(self.source_tip.to_string())
            .output()
            .await?;
        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            )),
            Some(1) => Ok(None),
            _ => Err(Error::Git(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }

    /// Whether the target tip is an ancestor of the source tip
    pub async fn target_is_ancestor(&self) -> Result<bool> {
        self.git()
            .args(["merge-base", "--is-ancestor"])
            .arg(self.target_tip.to_string())
            .arg(self.source_tip.to_string())
            .check()
            .await
    }

    /// Stream the unified diff of `merge-base..source_tip` to `on_line`
    ///
    /// Returning `false` from `on_line` stops git early. Files come out in
    /// path order.
    pub async fn range_diff_lines<F>(&self, on_line: F) -> Result<()>
    where
        F: FnMut(&str) -> bool,
    {
        let base = self
            .merge_base()
            .await?
            .unwrap_or_else(|| EMPTY_TREE.to_string());
        self.git()
            .args([
                "-c",
                "core.quotepath=false",
                "diff",
                "--no-color",
                "--no-ext-diff",
                "--no-textconv",
                "--no-renames",
                "--unified=3",
                "--src-prefix=a/",
                "--dst-prefix=b/",
            ])
            .arg(base)
            .arg(self.source_tip.to_string())
            .stream_lines(on_line)
            .await
    }

    /// Commits reachable from the source tip but not the target tip
    pub async fn commits(&self) -> Result<Vec<CommitSummary>> {
        let stdout = self
            .git()
            .args([
                "log",
                "--no-color",
                "--format=%H%x1f%an%x1f%ae%x1f%aI%x1f%s",
            ])
            .arg(self.source_tip.to_string())
            .arg(format!("^{}", self.target_tip))
            .arg("--")
            .run()
            .await?;
        stdout.lines().map(parse_commit_line).collect()
    }

    /// Remove the scratch repository
    pub fn close(self) {
        self.workspace.discard();
    }
}

fn parse_commit_line(line: &str) -> Result<CommitSummary> {
    let mut fields = line.splitn(5, FIELD_SEP);
    let mut next = || {
        fields
            .next()
            .ok_or_else(|| Error::Git(format!("malformed log line: {line}")))
    };
    let id = next()?.to_string();
    let author_name = next()?.to_string();
    let author_email = next()?.to_string();
    let authored_at = DateTime::parse_from_rfc3339(next()?)
        .map_err(|e| Error::Git(format!("bad commit date in '{line}': {e}")))?
        .with_timezone(&Utc);
    let summary = next()?.to_string();
    Ok(CommitSummary {
        id,
        author_name,
        author_email,
        summary,
        authored_at,
    })
}

/// Whether `target_branch` can be fast-forwarded to `source_branch`'s tip
///
/// Divergent history is `Ok(false)`; only resolution and I/O problems are
/// errors. Neither store's refs are modified.
pub async fn can_fast_forward(
    target_repo_path: &Path,
    source_repo_path: &Path,
    target_branch: &str,
    source_branch: &str,
    config: &EngineConfig,
) -> Result<bool> {
    let ctx = CompareContext::prepare(
        target_repo_path,
        source_repo_path,
        target_branch,
        source_branch,
        config,
    )
    .await?;
    let result = ctx.target_is_ancestor().await;
    ctx.close();
    result
}

/// Commits the source branch would bring into the target branch, newest first
pub async fn list_commits(
    target_repo_path: &Path,
    source_repo_path: &Path,
    target_branch: &str,
    source_branch: &str,
    config: &EngineConfig,
) -> Result<Vec<CommitSummary>> {
    let ctx = CompareContext::prepare(
        target_repo_path,
        source_repo_path,
        target_branch,
        source_branch,
        config,
    )
    .await?;
    let result = ctx.commits().await;
    ctx.close();
    result
}
