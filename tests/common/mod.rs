//! Shared test fixtures
//!
//! Repositories are real bare git repositories built with plumbing commands,
//! so every test controls exact history without touching a work tree.

#![allow(dead_code)]

pub mod mock_store;

pub use mock_store::RecordingStore;

use forkpull::config::EngineConfig;
use forkpull::store::MemoryStore;
use forkpull::types::Repository;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

/// Fixed commit timestamp base; each commit adds one second
const EPOCH: u64 = 1_704_067_200;
const ZERO_OID: &str = "0000000000000000000000000000000000000000";

/// A temp directory holding a repository root and a workspace root
pub struct GitFixture {
    dir: TempDir,
    /// Config pointing at this fixture's directories
    pub config: EngineConfig,
    clock: AtomicU64,
}

impl GitFixture {
    /// Empty fixture
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let mut config = EngineConfig::new(dir.path().join("repos"));
        config.workspace_root = dir.path().join("work");
        std::fs::create_dir_all(&config.repo_root).expect("create repo root");
        std::fs::create_dir_all(&config.workspace_root).expect("create workspace root");
        Self {
            dir,
            config,
            clock: AtomicU64::new(0),
        }
    }

    /// Temp directory root
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Where `owner/name` lives under the repository root
    pub fn repo_path(&self, owner: &str, name: &str) -> PathBuf {
        self.config
            .repo_root
            .join(owner.to_lowercase())
            .join(format!("{}.git", name.to_lowercase()))
    }

    /// Create an empty bare repository for `owner/name`
    pub fn init_repo(&self, owner: &str, name: &str) -> PathBuf {
        let path = self.repo_path(owner, name);
        std::fs::create_dir_all(&path).expect("create repo dir");
        let status = base_command()
            .args(["init", "--bare", "-q"])
            .arg(&path)
            .status()
            .expect("run git init");
        assert!(status.success(), "git init --bare failed");
        git(&path, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        path
    }

    /// Clone `upstream` as a bare fork owned by `owner`
    pub fn fork(&self, upstream: &Path, owner: &str, name: &str) -> PathBuf {
        let path = self.repo_path(owner, name);
        std::fs::create_dir_all(path.parent().expect("repo parent")).expect("create owner dir");
        let status = base_command()
            .args(["clone", "--bare", "-q"])
            .arg(upstream)
            .arg(&path)
            .status()
            .expect("run git clone");
        assert!(status.success(), "git clone --bare failed");
        path
    }

    /// Commit file changes on top of `branch` (creating it if missing)
    ///
    /// `None` content deletes the file. Returns the new commit ID.
    pub fn commit(
        &self,
        repo: &Path,
        branch: &str,
        files: &[(&str, Option<&str>)],
        message: &str,
    ) -> String {
        let parent = self.branch_tip(repo, branch);
        let index = self.dir.path().join(format!(
            "index-{}",
            self.clock.fetch_add(1, Ordering::SeqCst)
        ));
        let index_env = [("GIT_INDEX_FILE", index.as_os_str())];

        match &parent {
            Some(p) => git_env(repo, &["read-tree", p.as_str()], &index_env),
            None => git_env(repo, &["read-tree", "--empty"], &index_env),
        };

        for (path, content) in files {
            match content {
                Some(text) => {
                    let blob = git_stdin(repo, &["hash-object", "-w", "--stdin"], text, &[]);
                    let info = format!("100644,{blob},{path}");
                    git_env(
                        repo,
                        &["update-index", "--add", "--cacheinfo", &info],
                        &index_env,
                    );
                }
                None => {
                    // Mode 0 drops the entry; no work tree needed.
                    let info = format!("0 {ZERO_OID}\t{path}\n");
                    git_stdin(repo, &["update-index", "--index-info"], &info, &index_env);
                }
            }
        }

        let tree = git_env(repo, &["write-tree"], &index_env);
        let _ = std::fs::remove_file(&index);

        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        let date = format!("{} +0000", EPOCH + tick);
        let mut args = vec!["commit-tree", tree.as_str(), "-m", message];
        if let Some(p) = &parent {
            args.extend(["-p", p.as_str()]);
        }
        let commit = git_env(
            repo,
            &args,
            &[
                ("GIT_AUTHOR_NAME", OsStr::new("Test Author")),
                ("GIT_AUTHOR_EMAIL", OsStr::new("author@example.com")),
                ("GIT_AUTHOR_DATE", OsStr::new(&date)),
                ("GIT_COMMITTER_NAME", OsStr::new("Test Author")),
                ("GIT_COMMITTER_EMAIL", OsStr::new("author@example.com")),
                ("GIT_COMMITTER_DATE", OsStr::new(&date)),
            ],
        );

        let ref_name = format!("refs/heads/{branch}");
        git(repo, &["update-ref", &ref_name, &commit]);
        commit
    }

    /// Current tip of `branch`, if it exists
    pub fn branch_tip(&self, repo: &Path, branch: &str) -> Option<String> {
        let output = base_command()
            .arg("--git-dir")
            .arg(repo)
            .args(["rev-parse", "--verify", "-q"])
            .arg(format!("refs/heads/{branch}"))
            .output()
            .expect("run git rev-parse");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Point `branch` at `rev`
    pub fn create_branch(&self, repo: &Path, branch: &str, rev: &str) {
        git(repo, &["update-ref", &format!("refs/heads/{branch}"), rev]);
    }

    /// All refs of `repo` as `sha name` lines
    pub fn refs(&self, repo: &Path) -> String {
        git(repo, &["for-each-ref", "--format=%(objectname) %(refname)"])
    }

    /// Entries left in the workspace root
    pub fn workspace_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.config.workspace_root)
            .expect("read workspace root")
            .map(|e| e.expect("dir entry").path())
            .collect()
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Upstream `alice/project` with a seeded `master` and fork `bob/project`
pub struct ForkPair {
    /// The fixture owning both repositories
    pub fixture: GitFixture,
    /// Store with both repositories registered
    pub store: MemoryStore,
    /// `alice/project`
    pub upstream: Repository,
    /// `bob/project`, fork of upstream
    pub fork: Repository,
    /// Upstream object store
    pub upstream_path: PathBuf,
    /// Fork object store
    pub fork_path: PathBuf,
    /// Initial `master` commit shared by both
    pub base: String,
}

impl ForkPair {
    /// Seed upstream with one commit on `master`, then fork it
    pub fn new() -> Self {
        let fixture = GitFixture::new();
        let upstream_path = fixture.init_repo("alice", "project");
        let base = fixture.commit(
            &upstream_path,
            "master",
            &[("README.md", Some("# project\n"))],
            "Initial commit",
        );
        let fork_path = fixture.fork(&upstream_path, "bob", "project");

        let store = MemoryStore::new();
        let upstream = store
            .add_repository("alice", "project", None)
            .expect("add upstream");
        let fork = store
            .add_repository("bob", "project", Some(upstream.id))
            .expect("add fork");

        Self {
            fixture,
            store,
            upstream,
            fork,
            upstream_path,
            fork_path,
            base,
        }
    }

    /// Add `count` commits to `feature` in the fork, branching from master
    pub fn feature_commits(&self, count: usize) -> String {
        if self.fixture.branch_tip(&self.fork_path, "feature").is_none() {
            self.fixture
                .create_branch(&self.fork_path, "feature", &self.base);
        }
        let mut tip = String::new();
        for i in 0..count {
            let path = format!("src/file{i}.txt");
            let content = format!("change {i}\n");
            tip = self.fixture.commit(
                &self.fork_path,
                "feature",
                &[(path.as_str(), Some(content.as_str()))],
                &format!("Feature change {i}"),
            );
        }
        tip
    }

    /// Make upstream master diverge from the fork
    pub fn diverge_upstream(&self) -> String {
        self.fixture.commit(
            &self.upstream_path,
            "master",
            &[("UPSTREAM.md", Some("upstream only\n"))],
            "Upstream change",
        )
    }
}

impl Default for ForkPair {
    fn default() -> Self {
        Self::new()
    }
}

fn base_command() -> Command {
    let mut cmd = Command::new("git");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("LC_ALL", "C");
    cmd
}

/// Run git against a bare repository and return trimmed stdout
pub fn git(repo: &Path, args: &[&str]) -> String {
    git_env(repo, args, &[])
}

fn git_env(repo: &Path, args: &[&str], env: &[(&str, &OsStr)]) -> String {
    let mut cmd = base_command();
    cmd.arg("--git-dir").arg(repo).args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn git_stdin(repo: &Path, args: &[&str], input: &str, env: &[(&str, &OsStr)]) -> String {
    let mut cmd = base_command();
    cmd.arg("--git-dir")
        .arg(repo)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        cmd.env(key, value);
    }
    let mut child = cmd.spawn().expect("spawn git");
    child
        .stdin
        .take()
        .expect("git stdin")
        .write_all(input.as_bytes())
        .expect("write git stdin");
    let output = child.wait_with_output().expect("wait for git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
