//! RabbitMQ `BrokerChannel`: one durable queue on the default exchange.

use async_trait::async_trait;
use lapin::options::{BasicGetOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, info, warn};

use super::redact::redacted;
use crate::error::QueueError;
use crate::ports::BrokerChannel;

/// Persistent delivery mode.
const PERSISTENT: u8 = 2;

impl From<lapin::Error> for QueueError {
    fn from(e: lapin::Error) -> Self {
        QueueError::Broker(e.to_string())
    }
}

pub struct AmqpChannel {
    connection: Connection,
    channel: Channel,
    queue: String,
}

impl AmqpChannel {
    /// Connect and declare `queue` as durable.
    pub async fn connect(url: &str, queue: &str) -> Result<Self, QueueError> {
        info!(url = %redacted(url), queue = %queue, "connecting to rabbitmq");
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        debug!(queue = %queue, "queue declared");

        Ok(Self {
            connection,
            channel,
            queue: queue.to_string(),
        })
    }
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn publish(&self, body: &[u8]) -> Result<(), QueueError> {
        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into());

        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await?;
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<Vec<u8>>, QueueError> {
        let message = self
            .channel
            .basic_get(&self.queue, BasicGetOptions { no_ack: true })
            .await?;
        Ok(message.map(|m| m.delivery.data))
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        // Passive declare: inspects the queue without creating or altering it.
        let queue = self
            .channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    passive: true,
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(queue.message_count() as usize)
    }

    async fn close(&self) -> Result<(), QueueError> {
        if let Err(e) = self.channel.close(200, "Normal shutdown").await {
            warn!(error = %e, "error closing channel");
        }
        self.connection.close(200, "Normal shutdown").await?;
        info!(queue = %self.queue, "rabbitmq connection closed");
        Ok(())
    }
}
