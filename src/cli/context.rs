//! Shared command context for CLI commands
//!
//! Loads configuration and store state once per invocation and writes the
//! state back after commands that change it.

use forkpull::config::EngineConfig;
use forkpull::error::{Error, Result};
use forkpull::pulls::PullRequestService;
use forkpull::store::{MemoryStore, RepositoryStore, load_state, save_state, state_path};
use forkpull::types::Repository;
use std::path::{Path, PathBuf};

/// Shared context for CLI commands
pub struct CommandContext {
    /// Resolved engine configuration
    pub config: EngineConfig,
    /// Repository, issue and pull request records
    pub store: MemoryStore,
    /// Where the store state is persisted
    pub state_path: PathBuf,
    /// Acting user
    pub user: String,
}

impl CommandContext {
    /// Load config and state
    pub fn load(config: Option<&Path>, state: Option<&Path>, user: Option<&str>) -> Result<Self> {
        let config = EngineConfig::load(config)?;
        let state_path = state.map_or_else(state_path, Path::to_path_buf);
        let store = MemoryStore::from_state(load_state(&state_path)?);
        let user = user
            .map(String::from)
            .or_else(|| std::env::var("FORKPULL_USER").ok())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "anonymous".to_string());
        Ok(Self {
            config,
            store,
            state_path,
            user,
        })
    }

    /// Persist store state
    pub fn save(&self) -> Result<()> {
        save_state(&self.state_path, &self.store.snapshot()?)
    }

    /// Pull request service over this context's store
    pub const fn service(&self) -> PullRequestService<'_> {
        PullRequestService::new(&self.store, &self.store, &self.config)
    }

    /// Look up an `owner/name` repository
    pub async fn find_repo(&self, full_name: &str) -> Result<Repository> {
        let (owner, name) = parse_full_name(full_name)?;
        self.store.find_repository(owner, name).await
    }
}

/// Split `owner/name`
pub fn parse_full_name(full_name: &str) -> Result<(&str, &str)> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(Error::NotFound(format!(
            "repository '{full_name}' (expected owner/name)"
        ))),
    }
}
