//! Error types for stevedore

use thiserror::Error;

/// Main error type for stevedore
#[derive(Debug, Error)]
pub enum StevedoreError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Service '{0}' is not deployed. Check the service name, namespace and deployment status")]
    ServiceNotDeployed(String),

    #[error("Diagnosis exceeded {hops} hops; the rule graph is miswired")]
    TraversalLimit { hops: usize },

    #[error("Diagnosis deadline exceeded while {0}")]
    DeadlineExceeded(String),

    #[error("No context specified and no current context in kubeconfig")]
    NoContext,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StevedoreError {
    fn from(e: serde_json::Error) -> Self {
        StevedoreError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for StevedoreError {
    fn from(e: serde_yaml::Error) -> Self {
        StevedoreError::Serialization(e.to_string())
    }
}

/// Result type alias for stevedore
pub type Result<T> = std::result::Result<T, StevedoreError>;
