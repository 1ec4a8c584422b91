//! Blind strategic-merge patch strategy.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{Applied, ImageRef, StrategyKind, UpdateTarget, WorkloadUpdater};
use crate::cluster::DeploymentApi;
use crate::error::UpdateError;

/// Patches the container image without reading the Deployment first.
///
/// The patch merges the pod's container list by name. It is not checked
/// against the live object: if the named container does not exist, the API
/// server receives a patch that adds a container entry with only a name and
/// an image, which it may accept as a new container or reject during
/// validation. Either way the requested container is not updated. This is the
/// accepted cost of skipping the read.
pub struct PatchUpdater {
    deployments: Arc<dyn DeploymentApi>,
}

impl PatchUpdater {
    #[must_use]
    pub fn new(deployments: Arc<dyn DeploymentApi>) -> Self {
        Self { deployments }
    }
}

/// Strategic merge patch setting `container`'s image.
#[must_use]
pub fn image_patch(container: &str, image: &ImageRef) -> Value {
    json!({
        "spec": {
            "template": {
                "spec": {
                    "containers": [
                        { "name": container, "image": image.to_string() }
                    ]
                }
            }
        }
    })
}

#[async_trait]
impl WorkloadUpdater for PatchUpdater {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Patch
    }

    async fn apply(&self, target: &UpdateTarget) -> Result<Applied, UpdateError> {
        let container = target.container.as_deref().unwrap_or_default();
        let patch = image_patch(container, &target.image);

        debug!(container, image = %target.image, "Submitting image patch");

        self.deployments
            .patch(&target.namespace, &target.name, &patch)
            .await?;

        Ok(Applied::default())
    }
}
