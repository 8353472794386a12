//! Domain model (ids, messages, statuses, work sessions).

pub mod ids;
pub mod message;
pub mod session;
pub mod state;

pub use ids::MessageId;
pub use message::{Message, Payload, TaskKind};
pub use session::{CheckinEvent, EventKind, SessionStatus, WorkSession};
pub use state::MessageStatus;
