//! gke-cluster - lifecycle controller for GKE clusters
//!
//! Creates, configures, probes and deletes Google Kubernetes Engine clusters
//! by driving the `gcloud` CLI. Accelerator clusters additionally get the
//! NVIDIA device-plugin daemon set applied with `kubectl`.
//!
//! # Architecture
//!
//! - A [`controller::GkeCluster`] owns one immutable [`spec::ClusterSpec`] and
//!   turns lifecycle operations into gcloud invocations.
//! - Process execution sits behind [`command::CommandIssuer`] and manifest
//!   application behind [`manifest::ManifestApplier`], so the controller is
//!   tested without spawning anything.
//! - [`controller::provision`] and [`controller::teardown`] drive any
//!   [`controller::KubernetesCluster`] idempotently.
//!
//! # Modules
//!
//! - [`command`] - gcloud invocation builder, environment overlays, issuer
//! - [`config`] - YAML config file and pinned defaults
//! - [`controller`] - lifecycle trait, GKE controller, orchestrators
//! - [`manifest`] - remote manifest application
//! - [`retry`] - exponential backoff with jitter
//! - [`spec`] - cluster specification and validation
//! - [`error`] - error types

#![deny(missing_docs)]

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod manifest;
pub mod retry;
pub mod spec;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
