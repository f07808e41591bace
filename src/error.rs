//! Error types for GKE cluster lifecycle operations

use thiserror::Error;

/// Main error type for cluster lifecycle operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Cluster create or delete command failed or timed out
    #[error("provision error: {0}")]
    Provision(String),

    /// Cluster credentials could not be acquired within the retry budget
    #[error("auth error: {0}")]
    Auth(String),

    /// Device plugin manifest could not be applied to an accelerator cluster
    #[error("accelerator setup error: {0}")]
    AcceleratorSetup(String),

    /// Validation error for cluster specs
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration file could not be read or parsed
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a provision error with the given message
    pub fn provision(msg: impl Into<String>) -> Self {
        Self::Provision(msg.into())
    }

    /// Create an auth error with the given message
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create an accelerator setup error with the given message
    pub fn accelerator_setup(msg: impl Into<String>) -> Self {
        Self::AcceleratorSetup(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
