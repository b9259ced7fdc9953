//! Engine configuration loaded from `config.toml`
//!
//! All fields are optional; the engine works with zero config. Settings are
//! passed explicitly into every engine call as an [`EngineConfig`] rather
//! than read from process-wide state.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on emitted diff lines
pub const DEFAULT_MAX_DIFF_LINES: usize = 5000;

/// Default bound on each git invocation
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

const CONFIG_DIR: &str = "forkpull";
const CONFIG_FILE: &str = "config.toml";

/// On-disk configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Root directory holding `<owner>/<name>.git` object stores
    pub repo_root: Option<PathBuf>,
    /// Directory where merge workspaces are created
    pub workspace_root: Option<PathBuf>,
    /// Maximum total diff lines to emit (0 = unbounded)
    pub max_diff_lines: Option<usize>,
    /// Time budget for each git invocation, in seconds
    pub command_timeout_secs: Option<u64>,
}

/// Resolved engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory holding `<owner>/<name>.git` object stores
    pub repo_root: PathBuf,
    /// Directory where merge and comparison workspaces are created
    pub workspace_root: PathBuf,
    /// Maximum total diff lines to emit (0 = unbounded)
    pub max_diff_lines: usize,
    /// Time budget for each git invocation
    pub command_timeout: Duration,
}

impl EngineConfig {
    /// Config rooted at `repo_root` with defaults for everything else
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            workspace_root: std::env::temp_dir(),
            max_diff_lines: DEFAULT_MAX_DIFF_LINES,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    /// Apply values from a parsed config file
    pub fn with_file(mut self, file: ConfigFile) -> Self {
        if let Some(root) = file.repo_root {
            self.repo_root = root;
        }
        if let Some(root) = file.workspace_root {
            self.workspace_root = root;
        }
        if let Some(max) = file.max_diff_lines {
            self.max_diff_lines = max;
        }
        if let Some(secs) = file.command_timeout_secs {
            self.command_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Load configuration
    ///
    /// Reads `path` if given, otherwise the user config file if it exists,
    /// then applies `FORKPULL_REPO_ROOT` / `FORKPULL_MAX_DIFF_LINES`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_root = config_dir().join("repositories");
        let mut config = Self::new(default_root);

        let file_path = path.map_or_else(|| config_dir().join(CONFIG_FILE), Path::to_path_buf);
        if path.is_some() || file_path.exists() {
            config = config.with_file(load_config_file(&file_path)?);
        }

        if let Ok(root) = std::env::var("FORKPULL_REPO_ROOT") {
            config.repo_root = PathBuf::from(root);
        }
        if let Ok(max) = std::env::var("FORKPULL_MAX_DIFF_LINES") {
            config.max_diff_lines = max
                .parse()
                .map_err(|e| Error::Config(format!("FORKPULL_MAX_DIFF_LINES: {e}")))?;
        }

        Ok(config)
    }
}

/// Directory holding forkpull's config and state files
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIR)
}

/// Parse a config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}
