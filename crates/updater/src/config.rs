//! Process configuration.
//!
//! Flags and environment variables are declared on [`UpdaterArgs`] (flattened
//! into the binary's CLI) and validated into an immutable [`UpdaterConfig`].

use std::time::Duration;

use clap::Args;

use crate::dispatcher::{DispatchPolicy, NotFoundPolicy};
use crate::error::ConfigError;
use crate::queue::ReceiveOptions;
use crate::workload::{FailurePolicy, StrategyKind};

/// Messages requested per receive call
pub const MAX_BATCH: i32 = 2;

/// Longest visibility timeout SQS accepts (12 hours)
pub const MAX_VISIBILITY_TIMEOUT_SECS: i64 = 12 * 60 * 60;

/// Bounds for the long-poll wait
pub const MIN_WAIT_SECS: i64 = 15;
pub const MAX_WAIT_SECS: i64 = 25;

/// Updater flags.
#[derive(Debug, Clone, Args)]
pub struct UpdaterArgs {
    /// The name of the queue
    #[arg(short = 'q', long = "queue", env = "QUEUE_NAME", default_value = "")]
    pub queue: String,

    /// How long, in seconds, that the message is hidden from others
    #[arg(
        short = 't',
        long = "visibility-timeout",
        env = "VISIBILITY_TIMEOUT",
        default_value_t = 5,
        allow_negative_numbers = true
    )]
    pub visibility_timeout: i64,

    /// Long-poll wait in seconds (clamped to 15..=25)
    #[arg(long, env = "WAIT_SECONDS", default_value_t = 20)]
    pub wait_seconds: i64,

    /// AWS region of the queue
    #[arg(long, env = "AWS_REGION", default_value = "ap-southeast-2")]
    pub region: String,

    /// How workloads are updated
    #[arg(long, env = "UPDATE_STRATEGY", value_enum, default_value_t = StrategyKind::Spec)]
    pub strategy: StrategyKind,

    /// What to do when the cluster rejects a write [default: discard, or abort for release]
    #[arg(long, env = "ON_WRITE_FAILURE", value_enum)]
    pub on_write_failure: Option<FailurePolicy>,

    /// Extra attempts when the target workload or container is missing
    #[arg(long, default_value_t = 0)]
    pub not_found_retries: u32,

    /// Seconds between not-found retries
    #[arg(long, default_value_t = 5)]
    pub not_found_retry_delay: u64,

    /// Namespace for Helm releases when the request names none
    #[arg(long, env = "RELEASE_NAMESPACE", default_value = "default")]
    pub release_namespace: String,

    /// Chart to upgrade releases with [default: the release name]
    #[arg(long, env = "HELM_CHART")]
    pub chart: Option<String>,

    /// Dotted values key that receives the new tag
    #[arg(long, env = "HELM_VALUES_KEY", default_value = "image.tag")]
    pub values_key: String,
}

/// Settings for the Helm release strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    pub namespace: String,
    pub chart: Option<String>,
    pub values_key: String,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
    pub queue_name: String,
    pub region: String,
    pub visibility_timeout: i32,
    pub wait_seconds: i32,
    pub strategy: StrategyKind,
    pub on_write_failure: FailurePolicy,
    pub not_found: NotFoundPolicy,
    pub release: ReleaseSettings,
}

/// Clamp a visibility timeout to what the queue accepts.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // bounded by MAX_VISIBILITY_TIMEOUT_SECS
pub fn clamp_visibility_timeout(secs: i64) -> i32 {
    secs.clamp(0, MAX_VISIBILITY_TIMEOUT_SECS) as i32
}

/// Clamp a long-poll wait into the supported window.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn clamp_wait_seconds(secs: i64) -> i32 {
    secs.clamp(MIN_WAIT_SECS, MAX_WAIT_SECS) as i32
}

impl UpdaterArgs {
    /// Validate flags into an [`UpdaterConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if no queue name is given or the values key has
    /// empty segments.
    pub fn into_config(self) -> Result<UpdaterConfig, ConfigError> {
        let queue_name = self.queue.trim().to_string();
        if queue_name.is_empty() {
            return Err(ConfigError::MissingQueue);
        }

        if self.values_key.split('.').any(|segment| segment.trim().is_empty()) {
            return Err(ConfigError::InvalidValuesKey(self.values_key));
        }

        let not_found = if self.not_found_retries == 0 {
            NotFoundPolicy::Discard
        } else {
            NotFoundPolicy::Retry {
                attempts: self.not_found_retries,
                delay: Duration::from_secs(self.not_found_retry_delay),
            }
        };

        Ok(UpdaterConfig {
            queue_name,
            region: self.region,
            visibility_timeout: clamp_visibility_timeout(self.visibility_timeout),
            wait_seconds: clamp_wait_seconds(self.wait_seconds),
            strategy: self.strategy,
            on_write_failure: self
                .on_write_failure
                .unwrap_or_else(|| self.strategy.default_failure_policy()),
            not_found,
            release: ReleaseSettings {
                namespace: self.release_namespace,
                chart: self.chart.filter(|c| !c.trim().is_empty()),
                values_key: self.values_key,
            },
        })
    }
}

impl UpdaterConfig {
    #[must_use]
    pub const fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            max_messages: MAX_BATCH,
            wait_seconds: self.wait_seconds,
            visibility_timeout: self.visibility_timeout,
        }
    }

    #[must_use]
    pub const fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            on_write_failure: self.on_write_failure,
            not_found: self.not_found,
        }
    }
}
