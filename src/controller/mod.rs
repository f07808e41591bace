//! Cluster lifecycle controllers
//!
//! A [`KubernetesCluster`] exposes the four lifecycle operations. The
//! [`provision`] and [`teardown`] orchestrators drive any implementation
//! through them, so new cluster variants plug in without changes here.
//!
//! ```text
//! Absent ──create──▶ Creating ──▶ Created ──post_create──▶ Ready
//!    ▲                                                       │
//!    └──────────────── Deleting ◀──delete── (any state) ◀────┘
//! ```

mod gke;
mod provisioner;

pub use gke::GkeCluster;
pub use provisioner::{provision, teardown};

use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Lifecycle operations of a managed Kubernetes cluster
///
/// This trait abstracts the provider so orchestration can be tested with mocks.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubernetesCluster: Send + Sync {
    /// Cluster name used in logs
    fn name(&self) -> String;

    /// Provision the cluster infrastructure
    async fn create(&self) -> Result<()>;

    /// Make a created cluster usable: fetch credentials and install add-ons
    async fn post_create(&self) -> Result<()>;

    /// Tear the cluster down; valid from any state
    async fn delete(&self) -> Result<()>;

    /// Whether the provider reports the cluster as present.
    ///
    /// A failed probe reads as `false`, so callers must tolerate false
    /// negatives.
    async fn exists(&self) -> bool;
}

/// Cluster lifecycle phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClusterPhase {
    /// No cluster is known to exist
    #[default]
    Absent,
    /// Infrastructure is being provisioned
    Creating,
    /// Infrastructure exists but credentials have not been fetched
    Created,
    /// Credentials and add-ons are in place
    Ready,
    /// Infrastructure is being torn down
    Deleting,
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Creating => write!(f, "Creating"),
            Self::Created => write!(f, "Created"),
            Self::Ready => write!(f, "Ready"),
            Self::Deleting => write!(f, "Deleting"),
        }
    }
}
