//! forkpull - cross-repository pull requests with fast-forward merges

mod cli;

use clap::{Parser, Subcommand};
use cli::context::CommandContext;
use cli::style::Stylize;
use forkpull::error::Result;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "forkpull")]
#[command(about = "Cross-repository pull requests between forks", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// State file holding repositories and pull requests
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Acting user (defaults to $FORKPULL_USER, then $USER)
    #[arg(long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
    /// Open, inspect and merge pull requests
    Pull {
        #[command(subcommand)]
        command: PullCommands,
    },
    /// Diff two branches across repository stores
    Diff {
        /// Upstream repository path
        target_repo: PathBuf,
        /// Upstream branch
        target_branch: String,
        /// Fork repository path
        source_repo: PathBuf,
        /// Fork branch
        source_branch: String,
        /// Line budget (0 for unbounded; defaults to config)
        #[arg(long)]
        max_lines: Option<usize>,
        /// Print JSON instead of a patch
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Register a repository as owner/name
    Add {
        /// Repository as owner/name
        repo: String,
        /// Upstream this repository is a fork of
        #[arg(long)]
        fork_of: Option<String>,
    },
    /// List registered repositories
    List,
}

#[derive(Subcommand)]
enum PullCommands {
    /// Open a pull request against an upstream repository
    Open {
        /// Upstream repository as owner/name
        repo: String,
        /// Source as owner:branch
        #[arg(long)]
        from: String,
        /// Target as owner:branch
        #[arg(long)]
        to: String,
        /// Title
        #[arg(short, long)]
        title: String,
        /// Description
        #[arg(short, long, default_value = "")]
        body: String,
    },
    /// Show a pull request with its commits and diff
    Show {
        /// Upstream repository as owner/name
        repo: String,
        /// Pull request number
        index: u64,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a pull request can be fast-forwarded
    Check {
        /// Upstream repository as owner/name
        repo: String,
        /// Pull request number
        index: u64,
    },
    /// Comment on a pull request
    Comment {
        /// Upstream repository as owner/name
        repo: String,
        /// Pull request number
        index: u64,
        /// Comment text
        text: String,
    },
    /// Close a pull request without merging
    Close {
        /// Upstream repository as owner/name
        repo: String,
        /// Pull request number
        index: u64,
        /// Closing comment
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Fast-forward the target branch onto the source branch
    Merge {
        /// Upstream repository as owner/name
        repo: String,
        /// Pull request number
        index: u64,
        /// Merge comment
        #[arg(short, long, default_value = "")]
        message: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Respects RUST_LOG (e.g. RUST_LOG=forkpull=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_informational() => {
            anstream::eprintln!("{} {e}", "note:".warn());
            ExitCode::from(2)
        }
        Err(e) => {
            anstream::eprintln!("{} {e}", "error:".error());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let ctx = CommandContext::load(
        args.config.as_deref(),
        args.state.as_deref(),
        args.user.as_deref(),
    )?;

    match args.command {
        Commands::Repo { command } => match command {
            RepoCommands::Add { repo, fork_of } => {
                cli::repo::run_add(&ctx, &repo, fork_of.as_deref())
            }
            RepoCommands::List => cli::repo::run_list(&ctx),
        },
        Commands::Pull { command } => match command {
            PullCommands::Open {
                repo,
                from,
                to,
                title,
                body,
            } => cli::pull::run_open(&ctx, &repo, from, to, title, body).await,
            PullCommands::Show { repo, index, json } => {
                cli::pull::run_show(&ctx, &repo, index, json).await
            }
            PullCommands::Check { repo, index } => cli::pull::run_check(&ctx, &repo, index).await,
            PullCommands::Comment { repo, index, text } => {
                cli::pull::run_comment(&ctx, &repo, index, &text).await
            }
            PullCommands::Close {
                repo,
                index,
                message,
            } => cli::pull::run_close(&ctx, &repo, index, &message).await,
            PullCommands::Merge {
                repo,
                index,
                message,
                yes,
            } => cli::merge::run_merge(&ctx, &repo, index, &message, yes).await,
        },
        Commands::Diff {
            target_repo,
            target_branch,
            source_repo,
            source_branch,
            max_lines,
            json,
        } => {
            cli::diff::run_diff(
                &ctx,
                cli::diff::DiffArgs {
                    target_repo,
                    target_branch,
                    source_repo,
                    source_branch,
                    max_lines,
                    json,
                },
            )
            .await
        }
    }
}
