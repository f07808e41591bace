//! gcloud invocation builder and process-backed issuer

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{CommandError, CommandIssuer, CommandOutput, EnvOverlay, IssueOptions};
use crate::retry::{retry_with_backoff, RetryConfig};

/// Default gcloud executable, resolved through `PATH`
pub const DEFAULT_GCLOUD_BINARY: &str = "gcloud";

/// A gcloud invocation: positional arguments followed by `--flag [value]` pairs.
///
/// Every command requests JSON output and runs non-interactively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GcloudCommand {
    args: Vec<String>,
    flags: BTreeMap<String, Option<String>>,
}

impl GcloudCommand {
    /// Start a command from its positional arguments
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            flags: BTreeMap::new(),
        }
        .flag("format", "json")
        .switch("quiet")
    }

    /// Append a positional argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set `--name value`, replacing any earlier value
    pub fn flag(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.flags.insert(name.into(), Some(value.to_string()));
        self
    }

    /// Set a valueless `--name`
    pub fn switch(mut self, name: impl Into<String>) -> Self {
        self.flags.insert(name.into(), None);
        self
    }

    /// Scope the command to a project
    pub fn project(self, project: &str) -> Self {
        self.flag("project", project)
    }

    /// Scope the command to a zone when one is given
    pub fn zone(self, zone: Option<&str>) -> Self {
        match zone {
            Some(zone) => self.flag("zone", zone),
            None => self,
        }
    }

    /// Positional arguments
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Value of `--name`, if set with a value
    pub fn flag_value(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(|v| v.as_deref())
    }

    /// Whether `--name` is present, with or without a value
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Argument vector passed to the gcloud executable
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = self.args.clone();
        for (name, value) in &self.flags {
            argv.push(format!("--{name}"));
            if let Some(value) = value {
                argv.push(value.clone());
            }
        }
        argv
    }

    /// Command line as run by `binary`
    pub fn render(&self, binary: &str) -> String {
        format!("{} {}", binary, self.to_argv().join(" "))
    }
}

impl fmt::Display for GcloudCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_GCLOUD_BINARY))
    }
}

/// [`CommandIssuer`] that runs gcloud as a child process
#[derive(Clone, Debug)]
pub struct GcloudIssuer {
    binary: String,
    retry: RetryConfig,
    attempt_timeout: Option<Duration>,
}

impl GcloudIssuer {
    /// Issuer using `gcloud` from `PATH` and the default retry budget
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_GCLOUD_BINARY.to_string(),
            retry: RetryConfig::default(),
            attempt_timeout: None,
        }
    }

    /// Use a different gcloud executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Use a different retry budget for [`CommandIssuer::issue_retryable`]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Kill and retry any [`CommandIssuer::issue_retryable`] attempt that
    /// runs longer than `timeout`
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

impl Default for GcloudIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandIssuer for GcloudIssuer {
    async fn issue(
        &self,
        cmd: &GcloudCommand,
        opts: &IssueOptions,
    ) -> Result<CommandOutput, CommandError> {
        let description = cmd.render(&self.binary);
        let mut command = Command::new(&self.binary);
        command.args(cmd.to_argv()).kill_on_drop(true);
        opts.env.apply(&mut command);

        debug!(command = %description, timeout = ?opts.timeout, "Issuing command");

        let output = match opts.timeout {
            Some(timeout) => tokio::time::timeout(timeout, command.output())
                .await
                .map_err(|_| {
                    warn!(command = %description, ?timeout, "Command timed out");
                    CommandError::TimedOut {
                        command: description.clone(),
                        timeout,
                    }
                })?,
            None => command.output().await,
        }
        .map_err(|source| CommandError::Spawn {
            command: description.clone(),
            source,
        })?;

        let output = CommandOutput::from(output);
        if !output.success() {
            if opts.suppress_warning {
                debug!(
                    command = %description,
                    exit_code = output.exit_code,
                    stderr = %output.stderr.trim(),
                    "Command exited non-zero"
                );
            } else {
                warn!(
                    command = %description,
                    exit_code = output.exit_code,
                    stderr = %output.stderr.trim(),
                    "Command exited non-zero"
                );
            }
        }
        Ok(output)
    }

    async fn issue_retryable(
        &self,
        cmd: &GcloudCommand,
        env: &EnvOverlay,
    ) -> Result<CommandOutput, CommandError> {
        let description = cmd.render(&self.binary);
        let mut opts = IssueOptions::new().with_env(env.clone());
        opts.timeout = self.attempt_timeout;
        let opts = &opts;

        let result = retry_with_backoff(&self.retry, &description, || async move {
            match self.issue(cmd, opts).await {
                Ok(output) if output.success() => Ok(output),
                Ok(output) => Err(format!(
                    "exit code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                )),
                Err(e) => Err(e.to_string()),
            }
        })
        .await;

        match result {
            Ok(output) => {
                info!(command = %description, "Command succeeded");
                Ok(output)
            }
            Err(exhausted) => Err(CommandError::RetriesExhausted {
                command: description,
                attempts: exhausted.attempts,
                last_error: exhausted.last_error,
            }),
        }
    }
}
