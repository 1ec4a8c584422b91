//! Queue-driven deployment updater.
//!
//! Consumes rollout requests from an SQS queue and applies the requested
//! container image to a Kubernetes workload.
//!
//! # Architecture
//!
//! Two tasks joined by a bounded channel of capacity [`HANDOFF_CAPACITY`]:
//!
//! - [`Poller`] long-polls the queue and pushes messages into the channel,
//!   blocking while it is full.
//! - [`Dispatcher`] takes one message at a time, decodes and validates it,
//!   runs the configured [`WorkloadUpdater`] and deletes the message through
//!   the [`Acknowledger`] when it is handled.
//!
//! Service handles are built once by the caller and passed in; there is no
//! global state.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ack;
pub mod backoff;
pub mod cluster;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod poller;
pub mod queue;
pub mod request;
pub mod workload;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use ack::Acknowledger;
pub use config::{UpdaterArgs, UpdaterConfig};
pub use dispatcher::{DispatchPolicy, Dispatcher, NotFoundPolicy};
pub use error::{DispatchError, UpdateError};
pub use poller::Poller;
pub use queue::{MessageQueue, QueueMessage};
pub use request::{UpdateRequest, Validation};
pub use workload::{build_updater, StrategyKind, WorkloadUpdater};

/// Capacity of the buffer between poller and dispatcher
pub const HANDOFF_CAPACITY: usize = 2;

/// Run the poller and dispatcher until the dispatcher stops.
///
/// # Errors
///
/// Returns [`DispatchError::Fatal`] when an update fails under the `abort`
/// failure policy.
pub async fn run_updater(
    queue: Arc<dyn MessageQueue>,
    queue_url: String,
    updater: Box<dyn WorkloadUpdater>,
    config: &UpdaterConfig,
) -> Result<(), DispatchError> {
    let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);

    let poller = Poller::new(
        Arc::clone(&queue),
        queue_url.clone(),
        config.receive_options(),
    );
    let poll_task = tokio::spawn(poller.run(tx));

    let dispatcher = Dispatcher::new(
        updater,
        Acknowledger::new(queue, queue_url),
        config.dispatch_policy(),
    );
    let result = dispatcher.run(rx).await;

    poll_task.abort();
    result
}
