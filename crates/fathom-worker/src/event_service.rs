//! Routing callback bound to the event consumer.

use async_trait::async_trait;

use fathom_core::{MediaUploadedEvent, Topic};

use crate::consumer::{BatchHandler, EventMessage};
use crate::media_worker::MediaWorker;

/// Demultiplexes delivered batches by topic and dispatches each message's
/// `media_id` to the [`MediaWorker`].
pub struct MediaWorkerEventService {
    worker: MediaWorker,
}

impl MediaWorkerEventService {
    pub fn new(worker: MediaWorker) -> Self {
        Self { worker }
    }

    async fn handle_media_uploaded(&self, messages: &[EventMessage]) {
        for message in messages {
            let event: MediaUploadedEvent = match serde_json::from_slice(&message.payload) {
                Ok(event) => event,
                Err(e) => {
                    // Skip this message only; the rest of the batch proceeds.
                    tracing::error!(
                        partition = message.partition,
                        offset = message.offset,
                        error = %e,
                        "Missing or invalid media_id in message, skipping"
                    );
                    continue;
                }
            };

            tracing::info!(
                media_id = %event.media_id,
                partition = message.partition,
                offset = message.offset,
                "Dispatching media-uploaded event"
            );
            // process_media classifies and persists its own failures, so one
            // bad item never aborts the rest of the batch.
            self.worker.process_media(event.media_id).await;
        }
    }
}

#[async_trait]
impl BatchHandler for MediaWorkerEventService {
    async fn handle_batch(&self, topic_name: &str, messages: &[EventMessage]) -> anyhow::Result<()> {
        let Some(topic) = Topic::from_name(topic_name) else {
            tracing::warn!(topic = %topic_name, "Batch from unknown topic, ignoring");
            return Ok(());
        };

        tracing::debug!(topic = %topic_name, count = messages.len(), "Handling batch");

        match topic {
            Topic::MediaUploaded => self.handle_media_uploaded(messages).await,
        }

        Ok(())
    }
}
