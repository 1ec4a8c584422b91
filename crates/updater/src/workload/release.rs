//! Helm release upgrade strategy.

use std::sync::Arc;

use async_trait::async_trait;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::{Applied, StrategyKind, UpdateTarget, WorkloadUpdater};
use crate::cluster::{ReleaseManager, ReleaseUpgrade};
use crate::error::UpdateError;

/// Upgrades the named Helm release with the new tag set under a values key.
///
/// Only the tag is overridden; the repository is left to the chart's values.
/// Write failures on this path default to the `abort` failure policy.
pub struct ReleaseUpdater {
    releases: Arc<dyn ReleaseManager>,
    chart: Option<String>,
    default_namespace: String,
    values_key: String,
}

impl ReleaseUpdater {
    /// `chart` defaults to the release name when `None`; `values_key` is a
    /// dotted path such as `image.tag`.
    #[must_use]
    pub fn new(
        releases: Arc<dyn ReleaseManager>,
        chart: Option<String>,
        default_namespace: String,
        values_key: String,
    ) -> Self {
        Self {
            releases,
            chart,
            default_namespace,
            values_key,
        }
    }

    fn upgrade_for(&self, target: &UpdateTarget) -> ReleaseUpgrade {
        let namespace = if target.namespace.is_empty() {
            self.default_namespace.clone()
        } else {
            target.namespace.clone()
        };

        ReleaseUpgrade {
            release: target.name.clone(),
            chart: self.chart.clone().unwrap_or_else(|| target.name.clone()),
            namespace,
            values: values_override(&self.values_key, target.image.tag()),
        }
    }
}

/// Nest `value` under a dotted key: `image.tag` -> `{image: {tag: value}}`.
#[must_use]
pub fn values_override(key: &str, value: &str) -> Value {
    key.rsplit('.')
        .fold(Value::String(value.to_string()), |inner, segment| {
            let mut map = Mapping::new();
            map.insert(Value::String(segment.to_string()), inner);
            Value::Mapping(map)
        })
}

#[async_trait]
impl WorkloadUpdater for ReleaseUpdater {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Release
    }

    async fn apply(&self, target: &UpdateTarget) -> Result<Applied, UpdateError> {
        let upgrade = self.upgrade_for(target);
        debug!(
            release = %upgrade.release,
            namespace = %upgrade.namespace,
            key = %self.values_key,
            tag = target.image.tag(),
            "Upgrading release"
        );

        self.releases.upgrade(&upgrade).await?;
        Ok(Applied::default())
    }
}
