//! Work queue interface.
//!
//! The updater consumes the queue through the [`MessageQueue`] trait so the
//! poller and acknowledger can be driven by SQS in production and by an
//! in-memory queue in tests.

pub mod sqs;

use async_trait::async_trait;

use crate::error::QueueError;

pub use sqs::SqsQueue;

/// A received message. The receipt handle is needed to delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: Option<String>,
    pub receipt_handle: String,
    pub body: Vec<u8>,
}

impl QueueMessage {
    #[must_use]
    pub fn new(receipt_handle: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id: None,
            receipt_handle: receipt_handle.into(),
            body: body.into(),
        }
    }

    /// Message id for logging, `-` when the service did not supply one.
    #[must_use]
    pub fn id(&self) -> &str {
        self.message_id.as_deref().unwrap_or("-")
    }
}

/// Parameters for one long-poll receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub max_messages: i32,
    pub wait_seconds: i32,
    /// Seconds a received message stays hidden from other consumers
    pub visibility_timeout: i32,
}

/// Queue operations used by the poller and acknowledger.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Resolve a queue name to the URL used by the other calls.
    async fn resolve_url(&self, name: &str) -> Result<String, QueueError>;

    /// Long-poll for up to `options.max_messages` messages.
    async fn receive(
        &self,
        queue_url: &str,
        options: ReceiveOptions,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Delete a message by receipt handle.
    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), QueueError>;
}
