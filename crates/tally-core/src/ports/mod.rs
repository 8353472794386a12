//! Ports - the seams to everything outside the queue core.
//!
//! Each trait hides one external system (cache service, message broker,
//! downstream APIs, relational store) or one source of nondeterminism (time,
//! ids). Production adapters and in-process stand-ins live in `impls`.

pub mod broker;
pub mod clock;
pub mod collaborators;
pub mod id_generator;
pub mod kv_store;
pub mod session_repository;

pub use self::broker::BrokerChannel;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::collaborators::{Notifier, ReportingClient};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::kv_store::KeyValueStore;
pub use self::session_repository::SessionRepository;
