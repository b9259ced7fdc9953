//! Merge command - fast-forward the target branch of a pull request

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, arrow, check, spinner_style};
use anstream::println;
use dialoguer::Confirm;
use forkpull::error::{Error, Result};
use indicatif::ProgressBar;
use std::time::Duration;

/// Run the merge command
pub async fn run_merge(
    ctx: &CommandContext,
    repo: &str,
    index: u64,
    message: &str,
    yes: bool,
) -> Result<()> {
    let repo = ctx.find_repo(repo).await?;
    let service = ctx.service();
    let resolved = service.resolve(&repo, index).await?;
    let key = &resolved.pull.key;
    let from = format!("{}:{}", resolved.from_repo.owner, key.from_branch);
    let to = format!("{}:{}", resolved.to_repo.owner, key.to_branch);

    if !yes {
        println!(
            "{} {} {}",
            format!("#{index}").accent(),
            resolved.issue.title.emphasis(),
            format!("({from} {} {to})", arrow()).muted()
        );
        if !Confirm::new()
            .with_prompt("Proceed with merge?")
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            println!("{}", "Aborted".muted());
            return Ok(());
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!("Merging {} into {}...", from.emphasis(), to.emphasis()));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = service
        .merge_pull_request(&repo, index, &ctx.user, message)
        .await;
    // The merge comment is recorded even when the merge itself fails.
    let saved = ctx.save();

    match result {
        Ok(outcome) => {
            saved?;
            let short = |id: &str| id.get(..7).unwrap_or(id).to_string();
            spinner.finish_with_message(format!(
                "{} Merged {} {}",
                check(),
                format!("#{index}").accent(),
                format!(
                    "({}..{})",
                    short(&outcome.previous_tip),
                    short(&outcome.merged_tip)
                )
                .muted()
            ));
            if !outcome.advanced() {
                println!("  {}", "Target branch was already up to date".muted());
            }
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            if let Err(save_err) = saved {
                tracing::warn!(error = %save_err, "failed to save state after merge attempt");
            }
            Err(e)
        }
    }
}
