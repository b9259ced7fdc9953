//! `diff` command and patch rendering

use crate::cli::context::CommandContext;
use crate::cli::style::Stylize;
use anstream::println;
use forkpull::diff::{ChangeKind, DiffResult, LineKind, compute_forked_diff};
use forkpull::error::{Error, Result};
use std::path::PathBuf;

/// Arguments of the `diff` command
#[derive(Debug, Clone)]
pub struct DiffArgs {
    /// Upstream repository path
    pub target_repo: PathBuf,
    /// Upstream branch
    pub target_branch: String,
    /// Fork repository path
    pub source_repo: PathBuf,
    /// Fork branch
    pub source_branch: String,
    /// Line budget override
    pub max_lines: Option<usize>,
    /// Print JSON
    pub json: bool,
}

/// Run the diff command
pub async fn run_diff(ctx: &CommandContext, args: DiffArgs) -> Result<()> {
    let result = compute_forked_diff(
        &args.target_repo,
        &args.source_repo,
        &args.target_branch,
        &args.source_branch,
        args.max_lines.unwrap_or(ctx.config.max_diff_lines),
        &ctx.config,
    )
    .await?;

    if args.json {
        print_json(&result)
    } else {
        print_diff(&result);
        Ok(())
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Internal(format!("Failed to encode JSON: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Print a diff summary followed by its hunks
pub fn print_diff(result: &DiffResult) {
    println!(
        "{} {} {}",
        format!("{} file(s) changed", result.file_count()).emphasis(),
        format!("+{}", result.total_additions).success(),
        format!("-{}", result.total_deletions).error()
    );

    for file in &result.files {
        let marker = match file.kind {
            ChangeKind::Added => "A".success(),
            ChangeKind::Modified => "M".accent(),
            ChangeKind::Deleted => "D".error(),
        };
        println!();
        println!(
            "{marker} {} {}",
            file.path.emphasis(),
            format!("(+{} -{})", file.additions, file.deletions).muted()
        );
        if file.is_binary {
            let label = if file.is_image { "Image file" } else { "Binary file" };
            println!("  {}", label.muted());
            continue;
        }
        for hunk in &file.hunks {
            println!("{}", hunk.header.accent());
            for line in &hunk.lines {
                match line.kind {
                    LineKind::Context => println!(" {}", line.content),
                    LineKind::Added => println!("{}", format!("+{}", line.content).success()),
                    LineKind::Removed => println!("{}", format!("-{}", line.content).error()),
                }
            }
        }
        if file.is_incomplete {
            println!("{}", "... diff truncated for this file".warn());
        }
    }

    if result.truncated {
        println!();
        println!(
            "{}",
            format!(
                "Diff truncated after {} line(s); remaining files omitted",
                result.emitted_lines
            )
            .warn()
        );
    }
}
