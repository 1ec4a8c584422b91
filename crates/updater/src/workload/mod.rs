//! Workload image updates.
//!
//! All strategies implement [`WorkloadUpdater`]: apply a new image reference
//! to a target identified by namespace, workload name and (for Deployment
//! strategies) container name. The strategy is chosen once at startup.
//!
//! - [`SpecUpdater`] reads the Deployment, edits the named container and
//!   replaces the whole object.
//! - [`PatchUpdater`] submits a strategic merge patch without reading.
//! - [`ReleaseUpdater`] upgrades a Helm release with a tag override.

pub mod patch;
pub mod release;
pub mod spec;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;

use crate::cluster::{DeploymentApi, ReleaseManager};
use crate::config::UpdaterConfig;
use crate::error::UpdateError;
use crate::request::UpdateRequest;

pub use patch::PatchUpdater;
pub use release::ReleaseUpdater;
pub use spec::SpecUpdater;

/// Which update strategy the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// Read the Deployment, edit the container, replace the object
    Spec,
    /// Strategic merge patch of the container image, no read
    Patch,
    /// Helm release upgrade with an image tag override
    Release,
}

impl StrategyKind {
    /// Write-failure handling when none is configured.
    #[must_use]
    pub const fn default_failure_policy(self) -> FailurePolicy {
        match self {
            Self::Spec | Self::Patch => FailurePolicy::Discard,
            Self::Release => FailurePolicy::Abort,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Patch => "patch",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when the cluster rejects a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Log and delete the message
    Discard,
    /// Stop the process
    Abort,
}

/// Image reference rendered as `repo:tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    repo: String,
    tag: String,
}

impl ImageRef {
    #[must_use]
    pub fn new(repo: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            tag: tag.into(),
        }
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo, self.tag)
    }
}

/// Resolved target of one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    /// Empty when the request did not name one
    pub namespace: String,
    pub name: String,
    pub container: Option<String>,
    pub image: ImageRef,
}

impl UpdateTarget {
    #[must_use]
    pub fn from_request(request: &UpdateRequest) -> Self {
        let container = request.container_name.trim();
        Self {
            namespace: request.namespace.trim().to_string(),
            name: request.workload_name().to_string(),
            container: (!container.is_empty()).then(|| container.to_string()),
            image: ImageRef::new(request.repo.trim(), request.tag()),
        }
    }
}

/// A successful update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Image the container had before, when the strategy read it
    pub previous_image: Option<String>,
}

/// Applies an image reference change to a workload.
#[async_trait]
pub trait WorkloadUpdater: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn apply(&self, target: &UpdateTarget) -> Result<Applied, UpdateError>;
}

/// Build the updater selected by `config`.
#[must_use]
pub fn build_updater(
    config: &UpdaterConfig,
    deployments: Arc<dyn DeploymentApi>,
    releases: Arc<dyn ReleaseManager>,
) -> Box<dyn WorkloadUpdater> {
    match config.strategy {
        StrategyKind::Spec => Box::new(SpecUpdater::new(deployments)),
        StrategyKind::Patch => Box::new(PatchUpdater::new(deployments)),
        StrategyKind::Release => Box::new(ReleaseUpdater::new(
            releases,
            config.release.chart.clone(),
            config.release.namespace.clone(),
            config.release.values_key.clone(),
        )),
    }
}
