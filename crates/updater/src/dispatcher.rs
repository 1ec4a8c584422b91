//! Consumer loop: decode, validate, update, acknowledge.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::ack::Acknowledger;
use crate::error::{DispatchError, UpdateError};
use crate::queue::QueueMessage;
use crate::request::{UpdateRequest, Validation};
use crate::workload::{Applied, FailurePolicy, StrategyKind, UpdateTarget, WorkloadUpdater};

/// What to do when the target workload or container does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Delete the message immediately
    Discard,
    /// Try again up to `attempts` more times, then delete the message
    Retry { attempts: u32, delay: Duration },
}

/// Failure handling for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub on_write_failure: FailurePolicy,
    pub not_found: NotFoundPolicy,
}

/// Processes hand-off messages one at a time.
///
/// At most one update is in flight, so no per-workload locking is needed.
pub struct Dispatcher {
    updater: Box<dyn WorkloadUpdater>,
    acknowledger: Acknowledger,
    policy: DispatchPolicy,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        updater: Box<dyn WorkloadUpdater>,
        acknowledger: Acknowledger,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            updater,
            acknowledger,
            policy,
        }
    }

    /// Drain `rx` until it closes or an update fails fatally.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Fatal`] when a write is rejected under the
    /// `abort` failure policy. The failing message is not acknowledged.
    pub async fn run(self, mut rx: mpsc::Receiver<QueueMessage>) -> Result<(), DispatchError> {
        info!(strategy = %self.updater.kind(), "Starting dispatcher");

        while let Some(message) = rx.recv().await {
            if self.handle(&message).await? {
                self.acknowledger.acknowledge(message).await;
            } else {
                debug!(
                    message_id = message.id(),
                    "Leaving message for redelivery"
                );
            }
        }

        info!("Hand-off buffer closed, stopping dispatcher");
        Ok(())
    }

    /// Process one message and decide whether it should be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Fatal`] when a write is rejected under the
    /// `abort` failure policy.
    pub async fn handle(&self, message: &QueueMessage) -> Result<bool, DispatchError> {
        let message_id = message.id();
        debug!(
            message_id,
            body = %String::from_utf8_lossy(&message.body),
            "Received message"
        );

        let request = match UpdateRequest::parse(&message.body) {
            Ok(request) => request,
            Err(e) => {
                warn!(message_id, error = %e, "Discarding undecodable message");
                return Ok(true);
            }
        };

        if let Validation::Incomplete(missing) = request.validate(self.updater.kind()) {
            warn!(message_id, ?missing, "Discarding incomplete update request");
            return Ok(true);
        }

        let target = UpdateTarget::from_request(&request);

        match self.apply(&target).await {
            Ok(applied) => {
                info!(
                    message_id,
                    namespace = %target.namespace,
                    workload = %target.name,
                    container = target.container.as_deref().unwrap_or("-"),
                    image = %target.image,
                    previous = applied.previous_image.as_deref().unwrap_or("-"),
                    "Workload updated"
                );
                Ok(true)
            }
            Err(UpdateError::ClientUnavailable(reason)) => {
                error!(message_id, %reason, "Failed to create cluster client");
                Ok(false)
            }
            // Any release failure is a write failure.
            Err(e) if self.updater.kind() == StrategyKind::Release => {
                self.on_write_failure(message_id, e)
            }
            Err(e @ UpdateError::WriteRejected { .. }) => self.on_write_failure(message_id, e),
            Err(e @ UpdateError::ReadFailed { .. }) => {
                warn!(message_id, error = %e, "Failed to read workload, discarding");
                Ok(true)
            }
            Err(e) => {
                warn!(message_id, error = %e, "Could not find update target, discarding");
                Ok(true)
            }
        }
    }

    fn on_write_failure(&self, message_id: &str, e: UpdateError) -> Result<bool, DispatchError> {
        match self.policy.on_write_failure {
            FailurePolicy::Discard => {
                error!(message_id, error = %e, "Failed to update workload, discarding");
                Ok(true)
            }
            FailurePolicy::Abort => {
                error!(message_id, error = %e, "Failed to update workload, aborting");
                Err(DispatchError::Fatal(e))
            }
        }
    }

    async fn apply(&self, target: &UpdateTarget) -> Result<Applied, UpdateError> {
        let (mut remaining, delay) = match self.policy.not_found {
            NotFoundPolicy::Discard => (0, Duration::ZERO),
            NotFoundPolicy::Retry { attempts, delay } => (attempts, delay),
        };

        loop {
            match self.updater.apply(target).await {
                Err(e) if e.is_target_missing() && remaining > 0 => {
                    remaining -= 1;
                    debug!(
                        error = %e,
                        remaining,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Update target missing, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
