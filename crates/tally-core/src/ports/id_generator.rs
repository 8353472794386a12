//! IdGenerator port - message id generation.
//!
//! # Implementations
//! - **UlidGenerator**: ULID based, timestamp taken from a `Clock`.

use crate::domain::MessageId;
use crate::ports::Clock;
use ulid::Ulid;

/// Generates ids that are unique across producers without coordination.
pub trait IdGenerator: Send + Sync {
    fn generate_message_id(&self) -> MessageId;
}

/// ULID based generator.
///
/// The timestamp part comes from the injected clock, so ids minted under a
/// `FixedClock` share a deterministic prefix while the random part keeps
/// them unique.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_message_id(&self) -> MessageId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        MessageId::from_ulid(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
