//! Message status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a queued message.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Pending (retry, until max_attempts)
/// - Pending -> Processing -> Failed (max_attempts reached)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Waiting for delivery (possibly delayed by `process_at`).
    #[default]
    Pending,

    /// Claimed by a dequeue and in flight.
    Processing,

    /// Handled successfully.
    Completed,

    /// Gave up after max_attempts failures.
    Failed,
}

impl MessageStatus {
    /// Is this a terminal status (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Completed | MessageStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processing => "processing",
            MessageStatus::Completed => "completed",
            MessageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
