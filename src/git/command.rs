//! Bounded git child processes

use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Child;
use tracing::{debug, warn};

/// A single git invocation run in `dir` under a time budget
///
/// The child is killed if the budget is exceeded or the future is dropped.
/// Output can be collected whole ([`GitCommand::run`]) or read line by line
/// ([`GitCommand::stream_lines`]).
#[derive(Debug, Clone)]
pub struct GitCommand {
    dir: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl GitCommand {
    /// Start building `git` in `dir`
    pub fn new(dir: &Path, timeout: Duration) -> Self {
        Self {
            dir: dir.to_path_buf(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        let mut line = String::from("git");
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn spawn(&self) -> Result<Child> {
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(&self.args)
            .current_dir(&self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd.spawn()?)
    }

    /// Run and return the raw output regardless of exit status
    ///
    /// On timeout the child is killed and reaped before returning.
    pub async fn output(&self) -> Result<Output> {
        let line = self.display();
        debug!(dir = %self.dir.display(), command = %line, "running git");

        let mut child = self.spawn()?;
        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(Error::Internal(format!("{line}: output pipes not captured")));
        };

        let collected = tokio::time::timeout(self.timeout, async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
            )?;
            Ok::<_, std::io::Error>(Output {
                status,
                stdout: out,
                stderr: err,
            })
        })
        .await;

        match collected {
            Ok(output) => Ok(output?),
            Err(_) => {
                kill(&mut child, &line).await;
                Err(Error::Timeout {
                    command: line,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Run, feeding stdout to `on_line` one line at a time
    ///
    /// Lines are passed without their newline; invalid UTF-8 is replaced.
    /// When `on_line` returns `false` reading stops and the child is killed,
    /// which is not an error. Otherwise a non-zero exit becomes `Error::Git`.
    /// The time budget covers the whole run.
    pub async fn stream_lines<F>(&self, mut on_line: F) -> Result<()>
    where
        F: FnMut(&str) -> bool,
    {
        let line = self.display();
        debug!(dir = %self.dir.display(), command = %line, "streaming git");

        let mut child = self.spawn()?;
        let (Some(stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(Error::Internal(format!("{line}: output pipes not captured")));
        };
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            // a failed read only costs the error message
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let streamed = tokio::time::timeout(self.timeout, async {
            match read_lines(stdout, &mut on_line).await {
                Ok(true) => child.wait().await.map(Some),
                Ok(false) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await;

        match streamed {
            Ok(Ok(Some(status))) => {
                if status.success() {
                    return Ok(());
                }
                let output = Output {
                    status,
                    stdout: Vec::new(),
                    stderr: stderr_task.await.unwrap_or_default(),
                };
                Err(Error::Git(failure_message(&line, &output)))
            }
            Ok(Ok(None)) => {
                debug!(command = %line, "stopped reading output early");
                kill(&mut child, &line).await;
                Ok(())
            }
            Ok(Err(e)) => {
                kill(&mut child, &line).await;
                Err(e.into())
            }
            Err(_) => {
                kill(&mut child, &line).await;
                Err(Error::Timeout {
                    command: line,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Run, requiring success, and return stdout
    ///
    /// A non-zero exit becomes `Error::Git` carrying git's stderr.
    pub async fn run(&self) -> Result<String> {
        let output = self.output().await?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        Err(Error::Git(failure_message(&self.display(), &output)))
    }

    /// Run a predicate command such as `merge-base --is-ancestor`
    ///
    /// Exit 0 is `true`, exit 1 is `false`, anything else is an error.
    pub async fn check(&self) -> Result<bool> {
        let output = self.output().await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(Error::Git(failure_message(&self.display(), &output))),
        }
    }
}

/// Feed `reader` to `on_line`; `Ok(false)` when the callback stopped early
async fn read_lines<R, F>(reader: R, on_line: &mut F) -> std::io::Result<bool>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str) -> bool,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(true);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if !on_line(&*String::from_utf8_lossy(&buf)) {
            return Ok(false);
        }
    }
}

async fn kill(child: &mut Child, command: &str) {
    if let Err(e) = child.kill().await {
        warn!(command, error = %e, "failed to kill git");
    }
}

fn failure_message(command: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{command} exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}
