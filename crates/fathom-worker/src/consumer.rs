//! Event-stream consumer lifecycle.
//!
//! One [`ContainerController`] owns a Kafka consumer-group subscription and
//! feeds delivered batches to the registered [`BatchHandler`]. Handler
//! failures are logged and consumption continues (at-least-once delivery);
//! broker failures are fatal and surface to the process supervisor.
//! Shutdown is an explicit handle owned by the process entry point, not a
//! global: the in-flight batch finishes before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use thiserror::Error;
use tokio::sync::watch;

use fathom_core::Topic;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("broker error: {0}")]
    Broker(#[from] rdkafka::error::KafkaError),
}

/// One message as delivered by the broker, detached from client buffers.
#[derive(Debug, Clone)]
pub struct EventMessage {
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

/// The callback invoked with each delivered batch.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn handle_batch(&self, topic: &str, messages: &[EventMessage]) -> anyhow::Result<()>;
}

#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub poll_interval: Duration,
    pub max_batch_size: usize,
}

/// Triggers graceful termination of the consumer loop. Idempotent and safe
/// to call from a signal task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Owns the consumer subscription and the poll/dispatch loop.
pub struct ContainerController {
    consumer: StreamConsumer,
    handler: Arc<dyn BatchHandler>,
    config: ConsumerConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl ContainerController {
    /// Create the consumer, join the group, and subscribe to the pipeline's
    /// topics. Broker-level failures here are fatal.
    pub fn new(
        config: ConsumerConfig,
        handler: Arc<dyn BatchHandler>,
    ) -> Result<(Self, ShutdownHandle), ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.partition.eof", "false")
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;

        consumer.subscribe(Topic::subscribed())?;

        let (tx, rx) = watch::channel(false);

        Ok((
            Self {
                consumer,
                handler,
                config,
                shutdown_rx: rx,
            },
            ShutdownHandle { tx: Arc::new(tx) },
        ))
    }

    /// Consume until [`ShutdownHandle::shutdown`] is invoked or a broker
    /// failure occurs. The batch being handled when shutdown arrives runs
    /// to completion; offsets commit only after the handler returns.
    pub async fn start(mut self) -> Result<(), ConsumerError> {
        tracing::info!(
            group_id = %self.config.group_id,
            topics = ?Topic::subscribed(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_batch_size = self.config.max_batch_size,
            "Event consumer started"
        );

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let batch = tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    tracing::info!("Shutdown requested, stopping polling");
                    break;
                }
                batch = collect_batch(
                    &self.consumer,
                    self.config.poll_interval,
                    self.config.max_batch_size,
                ) => batch?,
            };

            if batch.is_empty() {
                continue;
            }

            for (topic, messages) in &batch {
                if let Err(e) = self.handler.handle_batch(topic, messages).await {
                    // At-least-once: log and keep polling; the uncommitted
                    // batch will be redelivered.
                    tracing::error!(topic = %topic, error = %e, "Batch handler failed");
                }
            }

            self.commit(&batch);
        }

        tracing::info!("Event consumer stopped, leaving consumer group");
        Ok(())
    }

    /// Commit the highest handled offset per partition. A failed commit is
    /// not fatal: redelivery is safe.
    fn commit(&self, batch: &[(String, Vec<EventMessage>)]) {
        let mut tpl = TopicPartitionList::new();
        for (topic, messages) in batch {
            let mut max_offsets: Vec<(i32, i64)> = Vec::new();
            for message in messages {
                match max_offsets.iter_mut().find(|(p, _)| *p == message.partition) {
                    Some((_, offset)) => *offset = (*offset).max(message.offset),
                    None => max_offsets.push((message.partition, message.offset)),
                }
            }
            for (partition, offset) in max_offsets {
                if let Err(e) = tpl.add_partition_offset(topic, partition, Offset::Offset(offset + 1))
                {
                    tracing::warn!(topic = %topic, partition = partition, error = %e, "Failed to stage offset for commit");
                }
            }
        }

        if let Err(e) = self.consumer.commit(&tpl, CommitMode::Async) {
            tracing::warn!(error = %e, "Offset commit failed, batch will be redelivered");
        }
    }
}

/// Drain up to `max_batch_size` messages within one poll window, grouped by
/// topic in delivery order.
async fn collect_batch(
    consumer: &StreamConsumer,
    poll_interval: Duration,
    max_batch_size: usize,
) -> Result<Vec<(String, Vec<EventMessage>)>, ConsumerError> {
    let mut raw = Vec::new();

    let deadline = tokio::time::sleep(poll_interval);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            message = consumer.recv() => {
                let message = message?;
                raw.push((
                    message.topic().to_string(),
                    EventMessage {
                        payload: message.payload().map(|p| p.to_vec()).unwrap_or_default(),
                        partition: message.partition(),
                        offset: message.offset(),
                    },
                ));
                if raw.len() >= max_batch_size {
                    break;
                }
            }
        }
    }

    Ok(group_by_topic(raw))
}

/// Group messages by topic, preserving per-topic delivery order and the
/// order in which topics first appeared.
fn group_by_topic(raw: Vec<(String, EventMessage)>) -> Vec<(String, Vec<EventMessage>)> {
    let mut grouped: Vec<(String, Vec<EventMessage>)> = Vec::new();
    for (topic, message) in raw {
        match grouped.iter_mut().find(|(t, _)| *t == topic) {
            Some((_, messages)) => messages.push(message),
            None => grouped.push((topic, vec![message])),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(partition: i32, offset: i64) -> EventMessage {
        EventMessage {
            payload: Vec::new(),
            partition,
            offset,
        }
    }

    #[test]
    fn test_group_by_topic_preserves_order() {
        let raw = vec![
            ("media-uploaded".to_string(), message(0, 1)),
            ("other".to_string(), message(0, 7)),
            ("media-uploaded".to_string(), message(1, 2)),
            ("media-uploaded".to_string(), message(0, 3)),
        ];

        let grouped = group_by_topic(raw);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "media-uploaded");
        assert_eq!(grouped[0].1.len(), 3);
        assert_eq!(grouped[0].1[0].offset, 1);
        assert_eq!(grouped[0].1[2].offset, 3);
        assert_eq!(grouped[1].0, "other");
    }

    #[test]
    fn test_shutdown_handle_is_idempotent() {
        let (tx, rx) = watch::channel(false);
        let handle = ShutdownHandle { tx: Arc::new(tx) };

        handle.shutdown();
        handle.shutdown();
        assert!(*rx.borrow());

        // Safe even after the receiver side is gone.
        drop(rx);
        handle.shutdown();
    }
}
