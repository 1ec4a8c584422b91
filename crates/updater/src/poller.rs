//! Queue poller: the producer side of the hand-off buffer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::backoff::Backoff;
use crate::queue::{MessageQueue, QueueMessage, ReceiveOptions};

/// Long-polls the queue and pushes each message into the hand-off buffer.
///
/// Pushing awaits buffer capacity, so a slow dispatcher stalls polling
/// instead of dropping messages. Receive errors are retried forever with
/// capped exponential backoff.
pub struct Poller {
    queue: Arc<dyn MessageQueue>,
    queue_url: String,
    options: ReceiveOptions,
    backoff: Backoff,
}

impl Poller {
    #[must_use]
    pub fn new(queue: Arc<dyn MessageQueue>, queue_url: String, options: ReceiveOptions) -> Self {
        Self {
            queue,
            queue_url,
            options,
            backoff: Backoff::default(),
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Poll until the receiving half of `tx` is dropped.
    pub async fn run(mut self, tx: mpsc::Sender<QueueMessage>) {
        info!(
            queue_url = %self.queue_url,
            max_messages = self.options.max_messages,
            wait_seconds = self.options.wait_seconds,
            "Starting queue poller"
        );

        loop {
            match self.queue.receive(&self.queue_url, self.options).await {
                Ok(messages) => {
                    self.backoff.reset();
                    if !messages.is_empty() {
                        debug!(count = messages.len(), "Received messages");
                    }

                    for message in messages {
                        if tx.send(message).await.is_err() {
                            info!("Hand-off buffer closed, stopping poller");
                            return;
                        }
                    }
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    error!(
                        error = %e,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Failed to fetch queue messages"
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            if tx.is_closed() {
                info!("Hand-off buffer closed, stopping poller");
                return;
            }
        }
    }
}
