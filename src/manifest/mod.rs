//! Applying remote manifests to a cluster
//!
//! The only manifest this crate applies is the accelerator device-plugin
//! daemon set, so the capability is a single "apply from URL" call. The
//! target cluster is whatever the overlay's kubeconfig points at.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::{info, warn};

use crate::command::EnvOverlay;
use crate::Error;

/// Default kubectl executable, resolved through `PATH`
pub const DEFAULT_KUBECTL_BINARY: &str = "kubectl";

/// Trait for applying a hosted manifest to a running cluster
///
/// This trait abstracts kubectl execution for testability.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManifestApplier: Send + Sync {
    /// Apply the manifest at `url` to the cluster selected by `env`
    async fn apply_from_url(&self, url: &str, env: &EnvOverlay) -> Result<(), Error>;
}

/// Manifest applier that shells out to `kubectl apply -f <url>`
#[derive(Clone, Debug)]
pub struct KubectlApplier {
    binary: String,
}

impl KubectlApplier {
    /// Applier using `kubectl` from `PATH`
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_KUBECTL_BINARY.to_string(),
        }
    }

    /// Use a different kubectl executable
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for KubectlApplier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestApplier for KubectlApplier {
    async fn apply_from_url(&self, url: &str, env: &EnvOverlay) -> Result<(), Error> {
        info!(url, kubeconfig = ?env.kubeconfig(), "Applying manifest");

        let mut command = Command::new(&self.binary);
        command.args(["apply", "-f", url]).kill_on_drop(true);
        env.apply(&mut command);

        let output = command.output().await.map_err(|e| {
            Error::accelerator_setup(format!("failed to run {}: {}", self.binary, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, stderr = %stderr.trim(), "Manifest apply failed");
            return Err(Error::accelerator_setup(format!(
                "{} apply -f {} failed: {}",
                self.binary,
                url,
                stderr.trim()
            )));
        }

        info!(url, "Manifest applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kubectl_applier_can_be_constructed_via_new_or_default() {
        assert_eq!(KubectlApplier::new().binary, "kubectl");
        assert_eq!(KubectlApplier::default().binary, "kubectl");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_apply_is_an_accelerator_setup_error() {
        let applier = KubectlApplier::with_binary("false");
        let err = applier
            .apply_from_url("https://example.invalid/ds.yaml", &EnvOverlay::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AcceleratorSetup(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_apply_returns_ok() {
        let applier = KubectlApplier::with_binary("true");
        let result = applier
            .apply_from_url(
                "https://example.invalid/ds.yaml",
                &EnvOverlay::new().with_kubeconfig("/tmp/kubeconfig"),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_kubectl_is_an_accelerator_setup_error() {
        let applier = KubectlApplier::with_binary("/nonexistent/kubectl");
        let err = applier
            .apply_from_url("https://example.invalid/ds.yaml", &EnvOverlay::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("/nonexistent/kubectl"));
    }
}
