//! Orchestration seams: Kubernetes Deployments and Helm releases.

pub mod helm;
pub mod kubernetes;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;

use crate::error::ClusterError;

pub use helm::HelmCli;
pub use kubernetes::KubeDeployments;

/// Access to `apps/v1` Deployments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Fetch a Deployment by namespace and name.
    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError>;

    /// Replace a Deployment with `deployment`, which must carry the
    /// `resourceVersion` it was read at.
    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError>;

    /// Apply a strategic merge patch without reading first.
    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Deployment, ClusterError>;
}

/// One Helm upgrade invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseUpgrade {
    pub release: String,
    /// Chart reference (`repo/chart`, path, or OCI URL)
    pub chart: String,
    pub namespace: String,
    /// Values merged over the release's current values
    pub values: serde_yaml::Value,
}

/// Upgrades packaged releases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseManager: Send + Sync {
    async fn upgrade(&self, upgrade: &ReleaseUpgrade) -> Result<(), ClusterError>;
}
