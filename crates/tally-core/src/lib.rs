//! tally-core
//!
//! Background task queue for shift check-out side effects.
//!
//! - **domain**: messages, ids, statuses, work sessions
//! - **ports**: seams to external systems (clock, ids, cache store, broker, collaborators, sessions)
//! - **queue**: the `Queue` contract, retry policy, and the in-process / cache / broker backends
//! - **impls**: production adapters (Redis, RabbitMQ) and in-process stand-ins
//! - **runtime**, **handlers**, **tasks**: dispatch by task kind
//! - **worker**: the single consumer loop
//! - **checkin**: the producing workflow

pub mod app;
pub mod checkin;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod runtime;
pub mod tasks;
pub mod worker;

pub use config::Config;
pub use domain::{Message, MessageId, MessageStatus, TaskKind};
pub use error::QueueError;
pub use queue::Queue;
