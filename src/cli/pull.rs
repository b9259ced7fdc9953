//! `pull` commands other than merge

use crate::cli::context::CommandContext;
use crate::cli::diff::{print_diff, print_json};
use crate::cli::style::{Stylize, arrow, check};
use anstream::println;
use forkpull::error::Result;
use forkpull::pulls::{CreateOutcome, NewPullRequest, PullView};
use forkpull::types::{CommentKind, IssueState};

/// Open a pull request
pub async fn run_open(
    ctx: &CommandContext,
    repo: &str,
    from: String,
    to: String,
    title: String,
    description: String,
) -> Result<()> {
    let upstream = ctx.find_repo(repo).await?;
    let outcome = ctx
        .service()
        .create_pull_request(
            &upstream,
            NewPullRequest {
                from,
                to,
                title,
                description,
                poster: ctx.user.clone(),
            },
        )
        .await?;

    let issue = outcome.issue();
    match &outcome {
        CreateOutcome::Created(..) => {
            ctx.save()?;
            println!(
                "{} Opened {} {}",
                check(),
                format!("#{}", issue.index).accent(),
                issue.title.emphasis()
            );
        }
        CreateOutcome::AlreadyExists(..) => {
            println!(
                "{} {} {}",
                "Already open:".warn(),
                format!("#{}", issue.index).accent(),
                issue.title.emphasis()
            );
        }
    }
    Ok(())
}

/// Show a pull request page
pub async fn run_show(ctx: &CommandContext, repo: &str, index: u64, json: bool) -> Result<()> {
    let repo = ctx.find_repo(repo).await?;
    let view = ctx.service().view(&repo, index).await?;

    if json {
        return print_json(&serde_json::json!({
            "issue": view.resolved.issue,
            "pull": view.resolved.pull,
            "from": view.resolved.from_repo.full_name(),
            "to": view.resolved.to_repo.full_name(),
            "comments": view.comments,
            "commits": view.commits,
            "diff": view.diff,
            "mergeable": view.mergeable,
        }));
    }

    print_view(&view);
    Ok(())
}

fn print_view(view: &PullView) {
    let issue = &view.resolved.issue;
    let pull = &view.resolved.pull;
    let state = match issue.state {
        IssueState::Open => issue.state.to_string().success(),
        IssueState::Closed => issue.state.to_string().error(),
        IssueState::Merged => issue.state.to_string().accent(),
    };

    println!(
        "{} {} [{state}]",
        format!("#{}", issue.index).accent(),
        issue.title.emphasis()
    );
    println!(
        "{} wants to merge {} into {}",
        issue.poster.emphasis(),
        format!("{}:{}", view.resolved.from_repo.owner, pull.key.from_branch).accent(),
        format!("{}:{}", view.resolved.to_repo.owner, pull.key.to_branch).accent()
    );
    if !issue.content.is_empty() {
        println!();
        println!("{}", issue.content);
    }
    if let (Some(commit), Some(by)) = (&pull.merged_commit, &pull.merged_by) {
        println!("{} merged by {} at {}", arrow(), by.emphasis(), commit.muted());
    }

    println!();
    println!("{}", format!("Commits ({})", view.commits.len()).emphasis());
    for commit in &view.commits {
        let short = commit.id.get(..7).unwrap_or(&commit.id);
        println!(
            "  {} {} {}",
            short.accent(),
            commit.summary,
            format!("({})", commit.author_name).muted()
        );
    }

    if !view.comments.is_empty() {
        println!();
        println!("{}", format!("Comments ({})", view.comments.len()).emphasis());
        for comment in &view.comments {
            let label = match comment.kind {
                CommentKind::Comment => "commented",
                CommentKind::Close => "closed",
                CommentKind::Merged => "merged",
            };
            println!(
                "  {} {} {}",
                comment.poster.emphasis(),
                label.muted(),
                comment.content
            );
        }
    }

    println!();
    if view.mergeable {
        println!("{} This branch can be fast-forwarded", check());
    } else {
        println!(
            "{}",
            "This branch has diverged and cannot be fast-forwarded".warn()
        );
    }

    println!();
    print_diff(&view.diff);
}

/// Report whether a pull request can be fast-forwarded
pub async fn run_check(ctx: &CommandContext, repo: &str, index: u64) -> Result<()> {
    let repo = ctx.find_repo(repo).await?;
    if ctx.service().check_mergeable(&repo, index).await? {
        println!("{} #{index} can be fast-forwarded", check());
    } else {
        println!("{}", format!("#{index} cannot be fast-forwarded").warn());
    }
    Ok(())
}

/// Comment on a pull request
pub async fn run_comment(ctx: &CommandContext, repo: &str, index: u64, text: &str) -> Result<()> {
    let repo = ctx.find_repo(repo).await?;
    ctx.service()
        .comment_on_pull_request(&repo, index, &ctx.user, text)
        .await?;
    ctx.save()?;
    println!("{} Commented on {}", check(), format!("#{index}").accent());
    Ok(())
}

/// Close a pull request
pub async fn run_close(ctx: &CommandContext, repo: &str, index: u64, message: &str) -> Result<()> {
    let repo = ctx.find_repo(repo).await?;
    ctx.service()
        .close_pull_request(&repo, index, &ctx.user, message)
        .await?;
    ctx.save()?;
    println!("{} Closed {}", check(), format!("#{index}").accent());
    Ok(())
}
