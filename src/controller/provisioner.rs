//! Idempotent provisioning and teardown on top of [`KubernetesCluster`]
//!
//! `exists` cannot tell a missing cluster from a describe that failed for
//! some other reason. Both orchestrators are written so that such a false
//! negative surfaces as an error rather than a silently leaked or silently
//! skipped cluster:
//!
//! - `provision` skips create only on a positive probe. A false negative
//!   makes create run against an existing cluster, which gcloud rejects, and
//!   that provision error is returned to the caller.
//! - `teardown` always issues delete. A failed delete is forgiven only when a
//!   follow-up probe reports the cluster gone.

use tracing::info;

use super::{ClusterPhase, KubernetesCluster};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::{Error, Result};

/// Bring a cluster to [`ClusterPhase::Ready`].
///
/// Create is skipped when the cluster already exists; post-create always
/// runs, so credentials are refreshed for a pre-existing cluster.
pub async fn provision<C: KubernetesCluster + ?Sized>(cluster: &C) -> Result<ClusterPhase> {
    let name = cluster.name();

    if cluster.exists().await {
        info!(cluster = %name, "Cluster already exists, skipping create");
    } else {
        info!(cluster = %name, phase = %ClusterPhase::Creating, "Provisioning cluster");
        cluster.create().await?;
    }

    info!(cluster = %name, phase = %ClusterPhase::Created, "Configuring cluster");
    cluster.post_create().await?;

    info!(cluster = %name, phase = %ClusterPhase::Ready, "Cluster ready");
    Ok(ClusterPhase::Ready)
}

/// Bring a cluster to [`ClusterPhase::Absent`].
///
/// After a successful delete, polls `exists` under `wait` until the cluster
/// is gone.
pub async fn teardown<C: KubernetesCluster + ?Sized>(
    cluster: &C,
    wait: &RetryConfig,
) -> Result<ClusterPhase> {
    let name = cluster.name();
    info!(cluster = %name, phase = %ClusterPhase::Deleting, "Tearing down cluster");

    if let Err(e) = cluster.delete().await {
        if cluster.exists().await {
            return Err(e);
        }
        info!(cluster = %name, error = %e, "Delete failed but cluster is absent");
        return Ok(ClusterPhase::Absent);
    }

    retry_with_backoff(wait, "wait_for_cluster_deletion", || async move {
        if cluster.exists().await {
            Err("cluster still exists")
        } else {
            Ok(())
        }
    })
    .await
    .map_err(|e| Error::provision(format!("cluster {} was not removed: {}", name, e)))?;

    info!(cluster = %name, phase = %ClusterPhase::Absent, "Cluster removed");
    Ok(ClusterPhase::Absent)
}
