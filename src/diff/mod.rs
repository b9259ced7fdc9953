//! Bounded diff between a target branch and a branch in a fork
//!
//! Two-phase pattern:
//! 1. Gather - stream `git diff` for `merge-base..source` through the
//!    parser, stopping git once the line budget is spent (effectful)
//! 2. Shape - order by path, apply the line budget (pure, testable)

mod parse;

pub use parse::{DiffParser, bound_diff, parse_unified_diff};

use crate::compare::CompareContext;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::repo::{ObjectId, RepoHandle};
use serde::Serialize;
use std::path::Path;

/// How a file changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File created
    Added,
    /// File content or mode changed
    Modified,
    /// File removed
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Kind of a hunk body line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// Unchanged context
    Context,
    /// Line added by the source branch
    Added,
    /// Line removed by the source branch
    Removed,
}

/// One line of a hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    /// Line kind
    pub kind: LineKind,
    /// Text without the leading marker
    pub content: String,
    /// Line number on the target side
    pub old_lineno: Option<u32>,
    /// Line number on the source side
    pub new_lineno: Option<u32>,
}

/// A contiguous block of changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    /// The `@@ ... @@` header line
    pub header: String,
    /// First line on the target side
    pub old_start: u32,
    /// Line count on the target side
    pub old_lines: u32,
    /// First line on the source side
    pub new_start: u32,
    /// Line count on the source side
    pub new_lines: u32,
    /// Body lines
    pub lines: Vec<DiffLine>,
}

/// Change record for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffFile {
    /// Repository-relative path
    pub path: String,
    /// Change kind
    pub kind: ChangeKind,
    /// Whether git treated the file as binary (no hunks)
    pub is_binary: bool,
    /// Whether a binary file's content at the source tip is an image
    pub is_image: bool,
    /// Added lines in the full file diff
    pub additions: usize,
    /// Removed lines in the full file diff
    pub deletions: usize,
    /// Emitted hunks
    pub hunks: Vec<DiffHunk>,
    /// Whether hunks were dropped by the line budget
    pub is_incomplete: bool,
}

impl DiffFile {
    pub(crate) const fn new(path: String) -> Self {
        Self {
            path,
            kind: ChangeKind::Modified,
            is_binary: false,
            is_image: false,
            additions: 0,
            deletions: 0,
            hunks: Vec::new(),
            is_incomplete: false,
        }
    }
}

/// Path-ordered change set, possibly truncated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// File records ordered by path
    pub files: Vec<DiffFile>,
    /// Sum of `additions` over `files`
    pub total_additions: usize,
    /// Sum of `deletions` over `files`
    pub total_deletions: usize,
    /// Hunk body lines emitted
    pub emitted_lines: usize,
    /// Whether the line budget cut the result short
    pub truncated: bool,
}

impl DiffResult {
    fn push_file(&mut self, file: DiffFile) {
        self.total_additions += file.additions;
        self.total_deletions += file.deletions;
        self.files.push(file);
    }

    /// Number of file records
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Diff `source_branch` (fork store) against `target_branch` (upstream store)
///
/// Covers the commits reachable from the source tip since its merge base
/// with the target tip. Output is ordered by path and bounded by
/// `max_lines` (0 = unbounded); see [`bound_diff`] for the cut policy.
/// Any failure, including an unresolvable branch, is `DiffUnavailable`.
pub async fn compute_forked_diff(
    target_repo_path: &Path,
    source_repo_path: &Path,
    target_branch: &str,
    source_branch: &str,
    max_lines: usize,
    config: &EngineConfig,
) -> Result<DiffResult> {
    let ctx = CompareContext::prepare(
        target_repo_path,
        source_repo_path,
        target_branch,
        source_branch,
        config,
    )
    .await
    .map_err(unavailable)?;

    let mut parser = DiffParser::new(max_lines);
    let streamed = ctx.range_diff_lines(|line| parser.push_line(line)).await;
    let source_tip = ctx.source_tip();
    ctx.close();
    streamed.map_err(unavailable)?;

    let mut files = parser.finish();
    mark_images(source_repo_path, source_tip, &mut files)
        .await
        .map_err(unavailable)?;
    Ok(bound_diff(files, max_lines))
}

/// Flag binary files whose content at the source tip is an image
async fn mark_images(
    source_repo_path: &Path,
    source_tip: ObjectId,
    files: &mut [DiffFile],
) -> Result<()> {
    let candidates: Vec<String> = files
        .iter()
        .filter(|f| f.is_binary && f.kind != ChangeKind::Deleted)
        .map(|f| f.path.clone())
        .collect();
    if candidates.is_empty() {
        return Ok(());
    }

    let repo_path = source_repo_path.to_path_buf();
    let images = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
        let handle = RepoHandle::open(&repo_path)?;
        Ok(candidates
            .into_iter()
            .filter(|path| handle.is_image_file(source_tip, path))
            .collect())
    })
    .await
    .map_err(|e| Error::Internal(format!("image check task failed: {e}")))??;

    for file in files.iter_mut() {
        file.is_image = images.contains(&file.path);
    }
    Ok(())
}

fn unavailable(e: Error) -> Error {
    match e {
        Error::DiffUnavailable(_) => e,
        other => Error::DiffUnavailable(other.to_string()),
    }
}
