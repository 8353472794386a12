//! BrokerChannel port - one durable queue on a message broker.
//!
//! `fetch` acknowledges on receipt: once it returns a body the broker has
//! forgotten the message. `AmqpChannel` implements this over RabbitMQ,
//! `MemoryBroker` in process for tests.

use async_trait::async_trait;

use crate::error::QueueError;

#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Publish a persistent message body.
    async fn publish(&self, body: &[u8]) -> Result<(), QueueError>;

    /// Fetch one body without waiting, acknowledging it immediately.
    async fn fetch(&self) -> Result<Option<Vec<u8>>, QueueError>;

    /// Number of messages waiting in the queue.
    async fn depth(&self) -> Result<usize, QueueError>;

    async fn close(&self) -> Result<(), QueueError>;
}
