//! Message acknowledgment.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::queue::{MessageQueue, QueueMessage};

/// Deletes handled messages from the queue.
///
/// Delete failures are logged and dropped; the message then reappears after
/// its visibility timeout and is processed again.
pub struct Acknowledger {
    queue: Arc<dyn MessageQueue>,
    queue_url: String,
}

impl Acknowledger {
    #[must_use]
    pub fn new(queue: Arc<dyn MessageQueue>, queue_url: String) -> Self {
        Self { queue, queue_url }
    }

    /// Delete `message`, consuming its receipt handle.
    pub async fn acknowledge(&self, message: QueueMessage) {
        debug!(message_id = message.id(), "Deleting message");

        if let Err(e) = self
            .queue
            .delete(&self.queue_url, &message.receipt_handle)
            .await
        {
            warn!(
                message_id = message.id(),
                error = %e,
                "Failed to delete message, it may be redelivered"
            );
        }
    }
}
