//! Message lifecycle policy shared by every backend.
//!
//! Backends differ in how they store and redeliver messages, but the state
//! transitions themselves (defaults at enqueue, claim on dequeue, completion,
//! the retry/backoff decision on failure) are defined once here.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Message, MessageStatus};
use crate::error::QueueError;
use crate::ports::IdGenerator;

/// `max_attempts` for messages enqueued without one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// The next step for a message whose delivery failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Back to Pending, eligible again at `process_at`.
    Retry {
        delay: Duration,
        process_at: DateTime<Utc>,
    },

    /// Attempts exhausted; terminal.
    Fail,
}

/// Retry policy for failed messages.
///
/// Backoff is quadratic in the attempt count: `delay = attempts² × unit`.
/// With the default one-minute unit the third failure waits 9 minutes before
/// the fourth attempt becomes eligible.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub unit: Duration,
}

impl RetryPolicy {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    pub fn next_delay(&self, attempts: u32) -> Duration {
        self.unit.saturating_mul(attempts.saturating_mul(attempts))
    }

    /// Decide what happens after the current attempt failed at `now`.
    ///
    /// `process_at` never moves backwards, even when a backend delivered the
    /// message before its previous `process_at` had elapsed. A delay too
    /// large to represent pins it to the latest representable instant.
    pub fn decide(&self, message: &Message, now: DateTime<Utc>) -> Decision {
        if message.attempts >= message.max_attempts {
            return Decision::Fail;
        }

        let delay = self.next_delay(message.attempts);
        let mut process_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if let Some(previous) = message.process_at {
            process_at = process_at.max(previous);
        }
        Decision::Retry { delay, process_at }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Fill in every field left unset by the producer.
///
/// A message arriving with its attempt budget already spent starts over
/// with `attempts = 0`, so a delivery can never push `attempts` past
/// `max_attempts`.
pub fn prepare(message: &mut Message, now: DateTime<Utc>, ids: &dyn IdGenerator) {
    if !message.id.is_assigned() {
        message.id = ids.generate_message_id();
    }
    if message.created_at.is_none() {
        message.created_at = Some(now);
    }
    if message.process_at.is_none() {
        message.process_at = Some(now);
    }
    if message.max_attempts == 0 {
        message.max_attempts = DEFAULT_MAX_ATTEMPTS;
    }
    if message.attempts >= message.max_attempts {
        message.attempts = 0;
    }
}

/// Claim a message for delivery: Processing, one more attempt.
pub fn claim(message: &mut Message) {
    message.status = MessageStatus::Processing;
    message.attempts += 1;
}

/// Mark a message completed.
///
/// Returns `Ok(false)` when it already was (a repeated completion is a
/// no-op), `Ok(true)` on the actual transition.
pub fn complete(message: &mut Message) -> Result<bool, QueueError> {
    match message.status {
        MessageStatus::Processing => {
            message.status = MessageStatus::Completed;
            Ok(true)
        }
        MessageStatus::Completed => Ok(false),
        status => Err(QueueError::NotInFlight {
            id: message.id.clone(),
            status,
        }),
    }
}

/// Apply the retry decision to an in-flight message.
pub fn fail(
    policy: &RetryPolicy,
    message: &mut Message,
    now: DateTime<Utc>,
) -> Result<Decision, QueueError> {
    if message.status != MessageStatus::Processing {
        return Err(QueueError::NotInFlight {
            id: message.id.clone(),
            status: message.status,
        });
    }

    let decision = policy.decide(message, now);
    match &decision {
        Decision::Retry { process_at, .. } => {
            message.status = MessageStatus::Pending;
            message.process_at = Some(*process_at);
        }
        Decision::Fail => message.status = MessageStatus::Failed,
    }
    Ok(decision)
}
