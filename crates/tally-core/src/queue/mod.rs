//! Queue module: the backend contract, the shared lifecycle policy and the
//! three backends.
//!
//! - `InProcessQueue`: bounded channel + map + delay heap. Lost on restart.
//! - `CacheQueue`: message hash + ready list on a key/value service.
//! - `BrokerQueue`: one durable queue on a message broker.

mod broker;
mod cache;
mod in_process;
pub mod policy;

pub use broker::{BrokerQueue, DEFAULT_QUEUE_NAME};
pub use cache::{CacheKeys, CacheQueue, DEFAULT_POP_TIMEOUT};
pub use in_process::{DEFAULT_CAPACITY, InProcessQueue};
pub use policy::{DEFAULT_MAX_ATTEMPTS, Decision, RetryPolicy};

use async_trait::async_trait;

use crate::domain::{Message, MessageId};
use crate::error::QueueError;

/// Queue port.
///
/// Many producers may call `enqueue` concurrently; exactly one consumer
/// calls `dequeue` and reports the outcome with `mark_completed` or
/// `mark_failed`.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Store a message and make it discoverable once due.
    ///
    /// Unset fields are filled in first (id, timestamps, `max_attempts`).
    /// Returns the id the message is stored under.
    async fn enqueue(&self, message: Message) -> Result<MessageId, QueueError>;

    /// Claim at most one ready message. Never waits indefinitely.
    async fn dequeue(&self) -> Result<Option<Message>, QueueError>;

    async fn mark_completed(&self, id: &MessageId) -> Result<(), QueueError>;

    /// Schedule a retry with backoff, or fail terminally once attempts are
    /// exhausted.
    async fn mark_failed(&self, id: &MessageId) -> Result<(), QueueError>;

    /// Messages waiting for delivery. Best effort: backend errors are logged
    /// and reported as 0.
    async fn pending_count(&self) -> usize;

    /// Current stored copy of a message.
    async fn inspect(&self, id: &MessageId) -> Result<Option<Message>, QueueError>;

    /// Stop accepting work and release resources. Idempotent.
    async fn close(&self) -> Result<(), QueueError>;
}
