//! GKE cluster controller
//!
//! Translates the four lifecycle operations into gcloud invocations:
//!
//! | Operation     | Command                                   | Overlay              | Mode            |
//! |---------------|-------------------------------------------|----------------------|-----------------|
//! | `create`      | `[alpha] container clusters create`       | credentials          | single, 600s    |
//! | `post_create` | `container clusters get-credentials`      | credentials + kubeconfig | retryable   |
//! | `delete`      | `container clusters delete`               | none                 | single          |
//! | `exists`      | `container clusters describe`             | none                 | single, quiet   |
//!
//! Accelerator clusters use the alpha command group with a pinned cluster
//! version, and get the device-plugin daemon set applied after credentials
//! have been fetched.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::KubernetesCluster;
use crate::command::{CommandIssuer, EnvOverlay, GcloudCommand, IssueOptions};
use crate::config::GkeSettings;
use crate::manifest::ManifestApplier;
use crate::spec::ClusterSpec;
use crate::{Error, Result};

/// Controller for a single GKE cluster
///
/// Holds no mutable state: every query goes back to gcloud. Callers must not
/// run overlapping lifecycle operations on the same instance.
pub struct GkeCluster {
    spec: ClusterSpec,
    settings: GkeSettings,
    credential_env: EnvOverlay,
    kubeconfig_env: EnvOverlay,
    issuer: Arc<dyn CommandIssuer>,
    applier: Arc<dyn ManifestApplier>,
}

impl GkeCluster {
    /// Create a controller for `spec`, validating it and `settings` first
    pub fn new(
        spec: ClusterSpec,
        settings: GkeSettings,
        issuer: Arc<dyn CommandIssuer>,
        applier: Arc<dyn ManifestApplier>,
    ) -> Result<Self> {
        spec.validate()?;
        settings.validate()?;

        let credential_env = EnvOverlay::application_default_credentials();
        let kubeconfig_env = credential_env
            .clone()
            .with_kubeconfig(settings.kubeconfig_for(&spec.name));

        Ok(Self {
            spec,
            settings,
            credential_env,
            kubeconfig_env,
            issuer,
            applier,
        })
    }

    /// The cluster this controller manages
    pub fn spec(&self) -> &ClusterSpec {
        &self.spec
    }

    /// Kubeconfig written by `post_create`
    pub fn kubeconfig(&self) -> PathBuf {
        self.settings.kubeconfig_for(&self.spec.name)
    }

    fn gcloud<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> GcloudCommand {
        GcloudCommand::new(args)
            .arg(&self.spec.name)
            .project(&self.spec.project)
            .zone(self.spec.zone.as_deref())
    }

    /// `clusters create` invocation for this spec
    pub fn create_command(&self) -> GcloudCommand {
        let cmd = match self.spec.accelerator() {
            Some(accelerator) => self
                .gcloud(["alpha", "container", "clusters", "create"])
                .switch("enable-kubernetes-alpha")
                .flag(
                    "cluster-version",
                    &self.settings.accelerator_cluster_version,
                )
                .flag("accelerator", accelerator.descriptor()),
            None => self.gcloud(["container", "clusters", "create"]),
        };

        cmd.flag("num-nodes", self.spec.num_nodes)
            .flag("machine-type", &self.spec.machine_type)
    }

    /// `clusters get-credentials` invocation
    pub fn credentials_command(&self) -> GcloudCommand {
        self.gcloud(["container", "clusters", "get-credentials"])
    }

    /// `clusters delete` invocation
    pub fn delete_command(&self) -> GcloudCommand {
        self.gcloud(["container", "clusters", "delete"])
    }

    /// `clusters describe` invocation
    pub fn describe_command(&self) -> GcloudCommand {
        self.gcloud(["container", "clusters", "describe"])
    }
}

#[async_trait]
impl KubernetesCluster for GkeCluster {
    fn name(&self) -> String {
        self.spec.name.clone()
    }

    #[instrument(skip(self), fields(cluster = %self.spec.name, project = %self.spec.project))]
    async fn create(&self) -> Result<()> {
        let cmd = self.create_command();
        info!(
            num_nodes = self.spec.num_nodes,
            machine_type = %self.spec.machine_type,
            accelerator = ?self.spec.accelerator().map(|a| a.descriptor()),
            "Creating cluster"
        );

        let opts = IssueOptions::new()
            .with_env(self.credential_env.clone())
            .with_timeout(self.settings.create_timeout());

        let output = self.issuer.issue(&cmd, &opts).await.map_err(|e| {
            Error::provision(format!("cluster create for {} failed: {}", self.spec.name, e))
        })?;

        if !output.success() {
            return Err(Error::provision(format!(
                "cluster create for {} exited with code {}: {}",
                self.spec.name,
                output.exit_code,
                output.stderr.trim()
            )));
        }

        info!("Cluster created");
        Ok(())
    }

    #[instrument(skip(self), fields(cluster = %self.spec.name, project = %self.spec.project))]
    async fn post_create(&self) -> Result<()> {
        let cmd = self.credentials_command();
        let output = self
            .issuer
            .issue_retryable(&cmd, &self.kubeconfig_env)
            .await
            .map_err(|e| {
                Error::auth(format!(
                    "credentials for {} could not be acquired: {}",
                    self.spec.name, e
                ))
            })?;

        if !output.success() {
            return Err(Error::auth(format!(
                "get-credentials for {} exited with code {}: {}",
                self.spec.name,
                output.exit_code,
                output.stderr.trim()
            )));
        }

        info!(kubeconfig = %self.kubeconfig().display(), "Acquired cluster credentials");

        if self.spec.has_accelerators() {
            let url = &self.settings.device_plugin_manifest_url;
            info!(url = %url, "Installing accelerator device plugin");
            self.applier
                .apply_from_url(url, &self.kubeconfig_env)
                .await
                .map_err(|e| match e {
                    Error::AcceleratorSetup(_) => e,
                    other => Error::accelerator_setup(other.to_string()),
                })?;
        }

        Ok(())
    }

    #[instrument(skip(self), fields(cluster = %self.spec.name, project = %self.spec.project))]
    async fn delete(&self) -> Result<()> {
        let cmd = self.delete_command();
        info!("Deleting cluster");

        let output = self
            .issuer
            .issue(&cmd, &IssueOptions::new())
            .await
            .map_err(|e| {
                Error::provision(format!("cluster delete for {} failed: {}", self.spec.name, e))
            })?;

        if !output.success() {
            return Err(Error::provision(format!(
                "cluster delete for {} exited with code {}: {}",
                self.spec.name,
                output.exit_code,
                output.stderr.trim()
            )));
        }

        info!("Cluster deleted");
        Ok(())
    }

    /// A failed describe reads as absent, whatever the reason it failed.
    async fn exists(&self) -> bool {
        let cmd = self.describe_command();
        match self
            .issuer
            .issue(&cmd, &IssueOptions::new().suppress_warning())
            .await
        {
            Ok(output) => {
                debug!(cluster = %self.spec.name, exit_code = output.exit_code, "Described cluster");
                output.success()
            }
            Err(e) => {
                debug!(cluster = %self.spec.name, error = %e, "Describe could not run");
                false
            }
        }
    }
}
