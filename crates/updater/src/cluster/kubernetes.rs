//! Kubernetes implementation of [`DeploymentApi`].

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    Client,
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::DeploymentApi;
use crate::error::ClusterError;

const KIND: &str = "Deployment";

/// Deployment access through `kube`.
///
/// The client is built from the default kubeconfig / in-cluster
/// configuration on first use and then reused. If building it fails, the
/// call reports [`ClusterError::Connect`] and the next call tries again.
#[derive(Default)]
pub struct KubeDeployments {
    client: OnceCell<Client>,
}

impl KubeDeployments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn api(&self, namespace: &str) -> Result<Api<Deployment>, ClusterError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let client = Client::try_default()
                    .await
                    .map_err(|e| ClusterError::Connect(e.to_string()))?;
                info!("Kubernetes client initialized");
                Ok::<_, ClusterError>(client)
            })
            .await?;

        Ok(Api::namespaced(client.clone(), namespace))
    }
}

fn map_error(err: kube::Error, namespace: &str, name: &str) -> ClusterError {
    match err {
        kube::Error::Api(e) if e.code == 404 => ClusterError::NotFound {
            kind: KIND,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        other => ClusterError::Rejected {
            name: name.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl DeploymentApi for KubeDeployments {
    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        let deployments = self.api(namespace).await?;
        debug!(namespace, name, "Fetching deployment");
        deployments
            .get(name)
            .await
            .map_err(|e| map_error(e, namespace, name))
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError> {
        let deployments = self.api(namespace).await?;
        debug!(namespace, name, "Replacing deployment");
        deployments
            .replace(name, &PostParams::default(), deployment)
            .await
            .map_err(|e| map_error(e, namespace, name))
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Deployment, ClusterError> {
        let deployments = self.api(namespace).await?;
        debug!(namespace, name, "Patching deployment");
        deployments
            .patch(name, &PatchParams::default(), &Patch::Strategic(patch))
            .await
            .map_err(|e| map_error(e, namespace, name))
    }
}
