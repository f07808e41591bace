//! Environment overlays attached to provider CLI invocations
//!
//! An overlay is layered on top of the inherited process environment of a
//! single child process. The process-wide environment is never modified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Makes `gcloud container` authenticate with application-default credentials
/// instead of prompting.
pub const APPLICATION_DEFAULT_CREDENTIALS_VAR: &str =
    "CLOUDSDK_CONTAINER_USE_APPLICATION_DEFAULT_CREDENTIALS";

/// Destination kubeconfig for `get-credentials` and source for `kubectl`
pub const KUBECONFIG_VAR: &str = "KUBECONFIG";

/// Immutable set of environment variables for one CLI invocation.
///
/// Builder methods consume the overlay and return a new one, so an overlay
/// handed to an issuer can not change underneath it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvOverlay {
    /// An overlay that adds nothing to the inherited environment
    pub fn new() -> Self {
        Self::default()
    }

    /// The credential-mode overlay required by create and get-credentials
    pub fn application_default_credentials() -> Self {
        Self::new().with_var(APPLICATION_DEFAULT_CREDENTIALS_VAR, "true")
    }

    /// Return a copy with `key` set to `value`
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Return a copy that points kubeconfig reads and writes at `path`
    pub fn with_kubeconfig(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy().into_owned();
        self.with_var(KUBECONFIG_VAR, path)
    }

    /// Value of `key` in this overlay
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Whether the credential-mode flag is set to `true`
    pub fn uses_application_default_credentials(&self) -> bool {
        self.get(APPLICATION_DEFAULT_CREDENTIALS_VAR) == Some("true")
    }

    /// Kubeconfig path carried by this overlay, if any
    pub fn kubeconfig(&self) -> Option<PathBuf> {
        self.get(KUBECONFIG_VAR).map(PathBuf::from)
    }

    /// True when the overlay adds no variables
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over the overlay's variables in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Layer this overlay onto a child process command
    pub fn apply(&self, command: &mut tokio::process::Command) {
        command.envs(self.iter());
    }
}
