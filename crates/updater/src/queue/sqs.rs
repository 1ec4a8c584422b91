//! Amazon SQS implementation of [`MessageQueue`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::Message;
use aws_sdk_sqs::Client;
use tracing::{debug, warn};

use super::{MessageQueue, QueueMessage, ReceiveOptions};
use crate::error::QueueError;

/// SQS-backed queue. Credentials come from the default AWS provider chain.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
}

impl SqsQueue {
    /// Load shared AWS configuration for `region` and build a client.
    pub async fn connect(region: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        debug!(region, "SQS client initialized");

        Self {
            client: Client::new(&shared),
        }
    }
}

fn convert(message: &Message) -> Option<QueueMessage> {
    let Some(receipt_handle) = message.receipt_handle() else {
        warn!(
            message_id = message.message_id().unwrap_or("-"),
            "Skipping message without receipt handle"
        );
        return None;
    };

    Some(QueueMessage {
        message_id: message.message_id().map(str::to_string),
        receipt_handle: receipt_handle.to_string(),
        body: message.body().unwrap_or_default().as_bytes().to_vec(),
    })
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn resolve_url(&self, name: &str) -> Result<String, QueueError> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| QueueError::Resolve {
                queue: name.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| QueueError::MissingUrl(name.to_string()))
    }

    async fn receive(
        &self,
        queue_url: &str,
        options: ReceiveOptions,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(options.max_messages)
            .wait_time_seconds(options.wait_seconds)
            .visibility_timeout(options.visibility_timeout)
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        Ok(output.messages().iter().filter_map(convert).collect())
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Delete(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
