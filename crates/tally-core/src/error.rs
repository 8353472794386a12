use thiserror::Error;

use crate::domain::{MessageId, MessageStatus, TaskKind};

/// Errors surfaced by a queue backend.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    /// The message is stored, but the ready channel was full. It becomes
    /// visible once a later dequeue finds room for it.
    #[error("queue is saturated, message {id} stored but not yet signalled")]
    Saturated { id: MessageId },

    #[error("message not found: {0}")]
    NotFound(MessageId),

    #[error("message {id} is not in flight (status={status})")]
    NotInFlight { id: MessageId, status: MessageStatus },

    #[error("message codec: {0}")]
    Codec(#[from] serde_json::Error),

    /// Key/value + list service failure (connectivity, protocol).
    #[error("store: {0}")]
    Store(String),

    /// Message broker failure (connectivity, channel state).
    #[error("broker: {0}")]
    Broker(String),
}

/// Errors raised while executing a task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("handler not found for task type={0}")]
    UnknownKind(String),

    #[error("downstream call failed: {0}")]
    Downstream(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown queue backend '{0}' (expected memory, redis or amqp)")]
    UnknownBackend(String),

    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("session repository: {0}")]
    Repository(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler already registered for task type={0}")]
    DuplicateHandler(TaskKind),
}
