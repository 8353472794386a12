//! Port implementations: production adapters and in-process stand-ins.

mod collaborators;
mod memory_broker;
mod memory_sessions;
mod memory_store;

#[cfg(feature = "amqp")]
mod amqp_channel;
#[cfg(any(feature = "redis", feature = "amqp"))]
mod redact;
#[cfg(feature = "redis")]
mod redis_store;

pub use collaborators::{LoggingNotifier, LoggingReporter};
pub use memory_broker::MemoryBroker;
pub use memory_sessions::InMemorySessionRepository;
pub use memory_store::MemoryStore;

#[cfg(feature = "amqp")]
pub use amqp_channel::AmqpChannel;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
