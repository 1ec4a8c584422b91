//! Read/modify/write strategy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Applied, StrategyKind, UpdateTarget, WorkloadUpdater};
use crate::cluster::DeploymentApi;
use crate::error::{ClusterError, UpdateError};

/// Fetches the Deployment, sets the named container's image and replaces the
/// full object.
///
/// The replace carries the `resourceVersion` that was read, so a concurrent
/// writer makes the API reject the update instead of being overwritten. A
/// missing container fails without writing anything.
pub struct SpecUpdater {
    deployments: Arc<dyn DeploymentApi>,
}

impl SpecUpdater {
    #[must_use]
    pub fn new(deployments: Arc<dyn DeploymentApi>) -> Self {
        Self { deployments }
    }
}

#[async_trait]
impl WorkloadUpdater for SpecUpdater {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Spec
    }

    async fn apply(&self, target: &UpdateTarget) -> Result<Applied, UpdateError> {
        let container_name = target.container.as_deref().unwrap_or_default();

        let mut deployment = self
            .deployments
            .get(&target.namespace, &target.name)
            .await
            .map_err(|e| match e {
                ClusterError::Rejected { name, reason } => UpdateError::ReadFailed { name, reason },
                other => other.into(),
            })?;

        let container = deployment
            .spec
            .as_mut()
            .and_then(|spec| spec.template.spec.as_mut())
            .and_then(|pod| pod.containers.iter_mut().find(|c| c.name == container_name))
            .ok_or_else(|| UpdateError::ContainerNotFound {
                name: target.name.clone(),
                container: container_name.to_string(),
            })?;

        let previous_image = container.image.replace(target.image.to_string());
        debug!(
            container = container_name,
            previous = previous_image.as_deref().unwrap_or("-"),
            image = %target.image,
            "Setting container image"
        );

        self.deployments
            .replace(&target.namespace, &target.name, &deployment)
            .await?;

        Ok(Applied { previous_image })
    }
}
