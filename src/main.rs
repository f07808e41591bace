//! gke-cluster - create, configure and delete GKE clusters

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gke_cluster::command::GcloudIssuer;
use gke_cluster::config::ClusterConfig;
use gke_cluster::controller::{provision, teardown, GkeCluster, KubernetesCluster};
use gke_cluster::manifest::KubectlApplier;
use gke_cluster::retry::RetryConfig;

/// gke-cluster - lifecycle controller for GKE clusters
#[derive(Parser, Debug)]
#[command(name = "gke-cluster", version, about, long_about = None)]
struct Cli {
    /// Path to the cluster YAML configuration file
    #[arg(short = 'f', long = "config")]
    config_file: PathBuf,

    /// Where to write cluster credentials (overrides the config file)
    #[arg(long, env = "GKE_CLUSTER_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Cluster version pinned for accelerator clusters (overrides the config file)
    #[arg(long)]
    cluster_version: Option<String>,

    /// Device-plugin manifest URL for accelerator clusters (overrides the config file)
    #[arg(long)]
    device_plugin_manifest: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the cluster if it does not exist, then fetch credentials
    Up,

    /// Delete the cluster and wait until it is gone
    Down {
        /// Maximum number of existence probes after delete (at least 1)
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..))]
        wait_attempts: u32,
    },

    /// Run the create step only
    Create,

    /// Run the post-create step only (credentials and device plugin)
    PostCreate,

    /// Run a single delete attempt
    Delete,

    /// Print whether the cluster exists; exits 1 when it does not
    Exists,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = ClusterConfig::load(&cli.config_file)?;
    if let Some(kubeconfig) = cli.kubeconfig {
        config.gke.kubeconfig = Some(kubeconfig);
    }
    if let Some(version) = cli.cluster_version {
        config.gke.accelerator_cluster_version = version;
    }
    if let Some(url) = cli.device_plugin_manifest {
        config.gke.device_plugin_manifest_url = url;
    }

    let issuer = GcloudIssuer::new()
        .with_binary(&config.gke.gcloud_binary)
        .with_retry(config.gke.credential_retry.clone())
        .with_attempt_timeout(config.gke.credential_attempt_timeout());
    let applier = KubectlApplier::with_binary(&config.gke.kubectl_binary);
    let cluster = GkeCluster::new(
        config.cluster,
        config.gke,
        Arc::new(issuer),
        Arc::new(applier),
    )?;

    match cli.command {
        Commands::Up => {
            let phase = provision(&cluster).await?;
            info!(
                cluster = %cluster.name(),
                %phase,
                kubeconfig = %cluster.kubeconfig().display(),
                "Provisioning complete"
            );
        }
        Commands::Down { wait_attempts } => {
            let wait = RetryConfig::with_max_attempts(wait_attempts);
            let phase = teardown(&cluster, &wait).await?;
            info!(cluster = %cluster.name(), %phase, "Teardown complete");
        }
        Commands::Create => cluster.create().await?,
        Commands::PostCreate => cluster.post_create().await?,
        Commands::Delete => cluster.delete().await?,
        Commands::Exists => {
            let exists = cluster.exists().await;
            println!("{exists}");
            if !exists {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_waits_thirty_probes_by_default() {
        let cli = Cli::try_parse_from(["gke-cluster", "-f", "c.yaml", "down"]).unwrap();
        assert!(matches!(cli.command, Commands::Down { wait_attempts: 30 }));
    }

    #[test]
    fn zero_wait_attempts_is_rejected() {
        let result =
            Cli::try_parse_from(["gke-cluster", "-f", "c.yaml", "down", "--wait-attempts", "0"]);
        assert!(result.is_err());
    }
}
