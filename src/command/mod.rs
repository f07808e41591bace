//! Provider CLI invocation
//!
//! The cluster controller never spawns processes itself. It builds a
//! [`GcloudCommand`] and hands it to a [`CommandIssuer`], which is mocked in
//! tests and backed by [`GcloudIssuer`] in production.

mod env;
mod gcloud;

pub use env::{EnvOverlay, APPLICATION_DEFAULT_CREDENTIALS_VAR, KUBECONFIG_VAR};
pub use gcloud::{GcloudCommand, GcloudIssuer, DEFAULT_GCLOUD_BINARY};

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Captured result of a finished CLI invocation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
    /// Process exit code (-1 when terminated by a signal)
    pub exit_code: i32,
}

impl CommandOutput {
    /// Output of an invocation that exited with `exit_code`
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// True when the process exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        }
    }
}

/// Options for a single-attempt invocation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IssueOptions {
    /// Variables layered onto the child's inherited environment
    pub env: EnvOverlay,
    /// Kill the process and fail if it runs longer than this
    pub timeout: Option<Duration>,
    /// Log a non-zero exit at debug instead of warn
    pub suppress_warning: bool,
}

impl IssueOptions {
    /// Options with no overlay, no timeout, and warnings enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an environment overlay
    pub fn with_env(mut self, env: EnvOverlay) -> Self {
        self.env = env;
        self
    }

    /// Bound the invocation's wall-clock time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Treat a failing exit as an expected outcome when logging
    pub fn suppress_warning(mut self) -> Self {
        self.suppress_warning = true;
        self
    }
}

/// Failures to obtain a usable result from the provider CLI.
///
/// A process that runs and exits non-zero is not an error at this level for
/// single-attempt invocations; callers inspect [`CommandOutput::exit_code`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be started
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// Underlying spawn or wait failure
        #[source]
        source: std::io::Error,
    },

    /// The process exceeded its timeout and was killed
    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut {
        /// Rendered command line
        command: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A retryable invocation never exited successfully
    #[error("`{command}` failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Rendered command line
        command: String,
        /// Number of attempts made
        attempts: u32,
        /// Description of the final failure
        last_error: String,
    },
}

/// Executes provider CLI invocations
///
/// This trait abstracts process execution for testability.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandIssuer: Send + Sync {
    /// Run `cmd` once and return its output, whatever the exit code.
    async fn issue(
        &self,
        cmd: &GcloudCommand,
        opts: &IssueOptions,
    ) -> Result<CommandOutput, CommandError>;

    /// Run `cmd` until it exits 0 or the issuer's retry budget is spent.
    ///
    /// An attempt that outlives the issuer's per-attempt timeout is killed
    /// and counts as a failed attempt.
    async fn issue_retryable(
        &self,
        cmd: &GcloudCommand,
        env: &EnvOverlay,
    ) -> Result<CommandOutput, CommandError>;
}
