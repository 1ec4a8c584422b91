//! Helm release upgrades through the `helm` CLI.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{ReleaseManager, ReleaseUpgrade};
use crate::error::ClusterError;

const KIND: &str = "Helm release";

/// Runs `helm upgrade` with the override values in a temporary values file.
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
}

impl Default for HelmCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("helm"),
        }
    }
}

impl HelmCli {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `helm` executable.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn upgrade_args(upgrade: &ReleaseUpgrade) -> Vec<String> {
        vec![
            "upgrade".to_string(),
            upgrade.release.clone(),
            upgrade.chart.clone(),
            "--namespace".to_string(),
            upgrade.namespace.clone(),
            "--reuse-values".to_string(),
            "--values".to_string(),
        ]
    }
}

/// Whether helm's stderr says the release does not exist.
fn is_missing_release(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("has no deployed releases") || stderr.contains("release: not found")
}

fn write_values(upgrade: &ReleaseUpgrade) -> Result<tempfile::NamedTempFile, ClusterError> {
    let rejected = |reason: String| ClusterError::Rejected {
        name: upgrade.release.clone(),
        reason,
    };

    let yaml = serde_yaml::to_string(&upgrade.values)
        .map_err(|e| rejected(format!("failed to render values: {e}")))?;

    let mut file = tempfile::Builder::new()
        .prefix("deploy-updater-values-")
        .suffix(".yaml")
        .tempfile()
        .map_err(|e| rejected(format!("failed to create values file: {e}")))?;
    file.write_all(yaml.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| rejected(format!("failed to write values file: {e}")))?;

    Ok(file)
}

#[async_trait]
impl ReleaseManager for HelmCli {
    async fn upgrade(&self, upgrade: &ReleaseUpgrade) -> Result<(), ClusterError> {
        let values = write_values(upgrade)?;

        let mut command = Command::new(&self.binary);
        command.args(Self::upgrade_args(upgrade)).arg(values.path());

        debug!(
            release = %upgrade.release,
            chart = %upgrade.chart,
            namespace = %upgrade.namespace,
            "Running helm upgrade"
        );

        let output = command
            .output()
            .await
            .map_err(|e| ClusterError::Rejected {
                name: upgrade.release.clone(),
                reason: format!("failed to execute helm: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing_release(&stderr) {
                return Err(ClusterError::NotFound {
                    kind: KIND,
                    namespace: upgrade.namespace.clone(),
                    name: upgrade.release.clone(),
                });
            }
            return Err(ClusterError::Rejected {
                name: upgrade.release.clone(),
                reason: format!("helm failed: {}", stderr.trim()),
            });
        }

        info!(release = %upgrade.release, "Helm upgrade completed");
        Ok(())
    }
}
