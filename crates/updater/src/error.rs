//! Error types for the deployment updater.

use thiserror::Error;

/// Errors raised while decoding a queue message body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body is not valid JSON, or a field has the wrong type
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Body is valid JSON but not an object
    #[error("payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// Errors talking to the queue service.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to resolve URL for queue '{queue}': {reason}")]
    Resolve { queue: String, reason: String },

    #[error("queue service returned no URL for queue '{0}'")]
    MissingUrl(String),

    #[error("failed to fetch messages: {0}")]
    Receive(String),

    #[error("failed to delete message: {0}")]
    Delete(String),
}

/// Errors reported by the cluster seams (Kubernetes API, Helm).
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Client or configuration could not be constructed
    #[error("cluster client unavailable: {0}")]
    Connect(String),

    /// Target resource does not exist
    #[error("{kind} '{name}' not found in namespace '{namespace}'")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// API or tool refused the request
    #[error("request for '{name}' rejected: {reason}")]
    Rejected { name: String, reason: String },
}

/// Outcome of a failed workload update, classified for the dispatcher.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Transient: the message stays unacknowledged for redelivery
    #[error("cluster client unavailable: {0}")]
    ClientUnavailable(String),

    #[error("workload '{name}' not found in namespace '{namespace}'")]
    WorkloadNotFound { namespace: String, name: String },

    #[error("container '{container}' not found in workload '{name}'")]
    ContainerNotFound { name: String, container: String },

    /// Workload exists but could not be read
    #[error("failed to read workload '{name}': {reason}")]
    ReadFailed { name: String, reason: String },

    #[error("write rejected for workload '{name}': {reason}")]
    WriteRejected { name: String, reason: String },
}

impl UpdateError {
    /// Whether the target (workload or container) was missing.
    #[must_use]
    pub const fn is_target_missing(&self) -> bool {
        matches!(
            self,
            Self::WorkloadNotFound { .. } | Self::ContainerNotFound { .. }
        )
    }
}

impl From<ClusterError> for UpdateError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Connect(reason) => Self::ClientUnavailable(reason),
            ClusterError::NotFound {
                namespace, name, ..
            } => Self::WorkloadNotFound { namespace, name },
            ClusterError::Rejected { name, reason } => Self::WriteRejected { name, reason },
        }
    }
}

/// Errors that stop the dispatcher loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Update failed under the `abort` failure policy
    #[error("fatal update failure: {0}")]
    Fatal(#[source] UpdateError),
}

/// Invalid process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("You must supply the name of a queue (-q QUEUE)")]
    MissingQueue,

    #[error("invalid Helm values key '{0}': segments must be non-empty")]
    InvalidValuesKey(String),
}
