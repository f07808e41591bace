//! Configuration file and operational settings
//!
//! The config file is YAML with a required `cluster` section and an optional
//! `gke` section. Every field of [`GkeSettings`] has a default, so the pinned
//! accelerator cluster version and device-plugin manifest have exactly one
//! place where they can be overridden.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::command::DEFAULT_GCLOUD_BINARY;
use crate::manifest::DEFAULT_KUBECTL_BINARY;
use crate::retry::RetryConfig;
use crate::spec::ClusterSpec;
use crate::Error;

/// Cluster version used for accelerator clusters.
///
/// GPU support requires alpha features that are not offered on the default
/// release channel, so accelerator clusters are pinned to a known-good version.
pub const DEFAULT_ACCELERATOR_CLUSTER_VERSION: &str = "1.8.1-gke.1";

/// Daemon set that installs the NVIDIA device plugin on GPU nodes
pub const DEFAULT_DEVICE_PLUGIN_MANIFEST_URL: &str = "https://raw.githubusercontent.com/GoogleCloudPlatform/container-engine-accelerators/k8s-1.8/device-plugin-daemonset.yaml";

/// Upper bound on `clusters create`
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(600);

/// Upper bound on each `get-credentials` attempt
pub const DEFAULT_CREDENTIAL_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Operational settings for the GKE controller
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GkeSettings {
    /// Cluster version pinned for accelerator clusters
    pub accelerator_cluster_version: String,

    /// Device-plugin daemon set applied to accelerator clusters
    pub device_plugin_manifest_url: String,

    /// Seconds to wait for `clusters create` before failing
    pub create_timeout_secs: u64,

    /// Where `get-credentials` writes the kubeconfig
    pub kubeconfig: Option<PathBuf>,

    /// Retry budget for credential acquisition
    pub credential_retry: RetryConfig,

    /// Seconds before a single `get-credentials` attempt is killed and
    /// retried (`null` waits indefinitely)
    pub credential_attempt_timeout_secs: Option<u64>,

    /// gcloud executable
    pub gcloud_binary: String,

    /// kubectl executable
    pub kubectl_binary: String,
}

impl Default for GkeSettings {
    fn default() -> Self {
        Self {
            accelerator_cluster_version: DEFAULT_ACCELERATOR_CLUSTER_VERSION.to_string(),
            device_plugin_manifest_url: DEFAULT_DEVICE_PLUGIN_MANIFEST_URL.to_string(),
            create_timeout_secs: DEFAULT_CREATE_TIMEOUT.as_secs(),
            kubeconfig: None,
            credential_retry: RetryConfig::default(),
            credential_attempt_timeout_secs: Some(DEFAULT_CREDENTIAL_ATTEMPT_TIMEOUT.as_secs()),
            gcloud_binary: DEFAULT_GCLOUD_BINARY.to_string(),
            kubectl_binary: DEFAULT_KUBECTL_BINARY.to_string(),
        }
    }
}

impl GkeSettings {
    /// Timeout applied to `clusters create`
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    /// Timeout applied to each `get-credentials` attempt
    pub fn credential_attempt_timeout(&self) -> Option<Duration> {
        self.credential_attempt_timeout_secs.map(Duration::from_secs)
    }

    /// Reject settings that would make every create time out immediately or
    /// give the credential retry loop an unusable schedule.
    pub fn validate(&self) -> Result<(), Error> {
        if self.create_timeout_secs == 0 {
            return Err(Error::config("createTimeoutSecs must be greater than 0"));
        }
        if self.credential_attempt_timeout_secs == Some(0) {
            return Err(Error::config(
                "credentialAttemptTimeoutSecs must be greater than 0",
            ));
        }
        self.credential_retry.validate().map_err(|e| match e {
            Error::Config(msg) => Error::config(format!("credentialRetry: {}", msg)),
            other => other,
        })
    }

    /// Kubeconfig path for `cluster_name`: the configured one, or a
    /// per-cluster file under the system temp directory.
    pub fn kubeconfig_for(&self, cluster_name: &str) -> PathBuf {
        self.kubeconfig
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{cluster_name}-kubeconfig")))
    }
}

/// Contents of a cluster config file
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// The cluster to manage
    pub cluster: ClusterSpec,

    /// Controller settings
    #[serde(default)]
    pub gke: GkeSettings,
}

impl ClusterConfig {
    /// Parse and validate a config document
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid cluster config: {}", e)))?;
        config.cluster.validate()?;
        config.gke.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, Error> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }
}
