//! External Tool Invocation
//!
//! Every collaborator this crate talks to (`xrandr`, `edid-decode`, the
//! wallpaper setter) is an external program. [`ToolRunner`] builds their
//! commands with the display-session environment applied and bounds each call
//! with a timeout.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

/// Environment variable naming the X display the tools act on
pub const DISPLAY_ENV: &str = "DISPLAY";

/// External tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// Program could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program name or path
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// A requested stdio pipe was not attached
    #[error("{program} has no {stream} pipe attached")]
    MissingPipe {
        /// Program name or path
        program: String,
        /// "stdin", "stdout" or "stderr"
        stream: &'static str,
    },

    /// Reading from or writing to the program failed
    #[error("I/O error while talking to {program}: {source}")]
    Io {
        /// Program name or path
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Program did not finish in time
    #[error("{program} did not finish within {after:?}")]
    Timeout {
        /// Program name or path
        program: String,
        /// Configured limit
        after: Duration,
    },

    /// Program exited unsuccessfully
    #[error("{program} exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        /// Program name or path
        program: String,
        /// Exit status
        status: ExitStatus,
        /// Captured standard error, trimmed
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Builds and runs external commands with a shared environment and timeout
#[derive(Debug, Clone)]
pub struct ToolRunner {
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl ToolRunner {
    /// Create a runner with the given per-call timeout and no extra environment
    pub fn new(timeout: Duration) -> Self {
        Self {
            env: Vec::new(),
            timeout,
        }
    }

    /// Set the display-session target passed to every child
    pub fn with_display(self, display: impl Into<String>) -> Self {
        self.with_env(DISPLAY_ENV, display)
    }

    /// Add an environment variable passed to every child
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.env.retain(|(k, _)| *k != key);
        self.env.push((key, value.into()));
        self
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Environment applied to children
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Build a command for `program` with the runner's environment applied.
    ///
    /// The child is killed if the returned handle is dropped before it exits,
    /// so abandoning a call on timeout never leaks a process.
    pub fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);
        cmd
    }

    /// Run `program` to completion and return its standard output.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Failed`] on a non-zero exit, [`ToolError::Timeout`]
    /// if the call exceeds the configured timeout.
    pub async fn run<S: AsRef<str>>(&self, program: &str, args: &[S]) -> Result<String, ToolError> {
        debug!(
            "Running: {} {}",
            program,
            args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ")
        );

        let mut cmd = self.command(program);
        cmd.args(args.iter().map(|a| a.as_ref()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout {
                program: program.to_string(),
                after: self.timeout,
            })?
            .map_err(|source| ToolError::Io {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Drain a child's piped stderr on its own task.
///
/// Returns `None` when stderr was not piped.
pub fn collect_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut buf = Vec::new();
        // Partial output is still useful for the error message
        let _ = stderr.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).trim().to_string()
    }))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_stdout() {
        let runner = ToolRunner::default();
        let out = runner.run("sh", &["-c", "echo hello"]).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_passes_display_to_child() {
        let runner = ToolRunner::default().with_display(":7");
        let out = runner.run("sh", &["-c", "echo $DISPLAY"]).await.unwrap();
        assert_eq!(out.trim(), ":7");
    }

    #[tokio::test]
    async fn test_with_env_replaces_existing_key() {
        let runner = ToolRunner::default().with_display(":0").with_display(":1");
        assert_eq!(runner.env(), &[("DISPLAY".to_string(), ":1".to_string())]);
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_is_failure() {
        let runner = ToolRunner::default();
        let err = runner
            .run("sh", &["-c", "echo 'cannot open display' >&2; exit 3"])
            .await
            .unwrap_err();

        match err {
            ToolError::Failed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "cannot open display");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_missing_program_is_spawn_error() {
        let runner = ToolRunner::default();
        let err = runner
            .run::<&str>("/nonexistent/xrandr-arrange-test-tool", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let runner = ToolRunner::new(Duration::from_millis(100));
        let err = runner.run("sleep", &["5"]).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }
}
