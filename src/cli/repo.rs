//! `repo` commands

use crate::cli::context::{CommandContext, parse_full_name};
use crate::cli::style::{Stylize, arrow, check};
use anstream::println;
use forkpull::error::{Error, Result};

/// Register `owner/name`, optionally as a fork of another repository
pub fn run_add(ctx: &CommandContext, full_name: &str, fork_of: Option<&str>) -> Result<()> {
    let (owner, name) = parse_full_name(full_name)?;
    let parent = match fork_of {
        Some(parent) => {
            let (p_owner, p_name) = parse_full_name(parent)?;
            let snapshot = ctx.store.repositories()?;
            let found = snapshot
                .into_iter()
                .find(|r| r.is_owned_by(p_owner) && r.name.eq_ignore_ascii_case(p_name))
                .ok_or_else(|| {
                    Error::NotFound(format!("repository {p_owner}/{p_name}"))
                })?;
            Some(found)
        }
        None => None,
    };

    let repo = ctx
        .store
        .add_repository(owner, name, parent.as_ref().map(|p| p.id))?;
    ctx.save()?;

    println!(
        "{} Registered {}",
        check(),
        repo.full_name().emphasis()
    );
    if let Some(parent) = parent {
        println!("  {} fork of {}", arrow(), parent.full_name().accent());
    }
    println!(
        "  {} {}",
        arrow(),
        repo.path(&ctx.config.repo_root).display().muted()
    );
    Ok(())
}

/// List registered repositories
pub fn run_list(ctx: &CommandContext) -> Result<()> {
    let repos = ctx.store.repositories()?;
    if repos.is_empty() {
        println!("{}", "No repositories registered".muted());
        return Ok(());
    }

    for repo in &repos {
        match repo.fork_parent {
            Some(parent_id) => {
                let parent = repos
                    .iter()
                    .find(|r| r.id == parent_id)
                    .map_or_else(|| format!("#{parent_id}"), |r| r.full_name());
                println!(
                    "{} {}",
                    repo.full_name().emphasis(),
                    format!("(fork of {parent})").muted()
                );
            }
            None => println!("{}", repo.full_name().emphasis()),
        }
    }
    Ok(())
}

