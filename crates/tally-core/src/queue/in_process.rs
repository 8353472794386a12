//! In-process queue: bounded ready channel + shared map + delay heap.
//!
//! Nothing here survives a restart. Claims are exclusive: an id leaves the
//! ready channel through exactly one receive, and the message is flipped to
//! Processing under the same write lock.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::policy::{self, Decision, RetryPolicy};
use super::Queue;
use crate::domain::{Message, MessageId, MessageStatus};
use crate::error::QueueError;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};

/// Capacity of the ready channel when none is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Delay heap entry.
///
/// Ordering is reversed so `BinaryHeap` acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled {
    process_at: DateTime<Utc>,
    id: MessageId,
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .process_at
            .cmp(&self.process_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

struct InProcessState {
    /// Every message ever enqueued (single source of truth).
    messages: HashMap<MessageId, Message>,

    /// Pending messages not yet signalled: delayed retries, future
    /// `process_at`, and ids that found the ready channel full.
    delayed: BinaryHeap<Scheduled>,

    /// Sending half of the ready channel. Dropped on close.
    ready_tx: Option<mpsc::Sender<MessageId>>,

    closed: bool,
}

impl InProcessState {
    /// Hand an id to the ready channel, giving it back if there is no room.
    fn signal(&self, id: MessageId) -> Result<(), MessageId> {
        let Some(tx) = &self.ready_tx else {
            return Err(id);
        };
        tx.try_send(id).map_err(|e| match e {
            TrySendError::Full(id) | TrySendError::Closed(id) => id,
        })
    }

    /// Move due entries from the delay heap into the ready channel, as far
    /// as the channel has room.
    fn promote_due(&mut self, now: DateTime<Utc>) {
        while self.delayed.peek().is_some_and(|e| e.process_at <= now) {
            let Some(entry) = self.delayed.pop() else {
                break;
            };
            let still_pending = self
                .messages
                .get(&entry.id)
                .is_some_and(|m| m.status == MessageStatus::Pending);
            if !still_pending {
                continue;
            }
            if let Err(id) = self.signal(entry.id) {
                self.delayed.push(Scheduled {
                    process_at: entry.process_at,
                    id,
                });
                break;
            }
        }
    }
}

/// In-process queue implementation.
pub struct InProcessQueue {
    state: RwLock<InProcessState>,
    ready_rx: Mutex<mpsc::Receiver<MessageId>>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InProcessQueue {
    pub fn new(capacity: usize) -> Self {
        let (ready_tx, ready_rx) = mpsc::channel(capacity.max(1));
        Self {
            state: RwLock::new(InProcessState {
                messages: HashMap::new(),
                delayed: BinaryHeap::new(),
                ready_tx: Some(ready_tx),
                closed: false,
            }),
            ready_rx: Mutex::new(ready_rx),
            policy: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `clock` for timestamps, visibility checks and id generation.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        self.clock = clock;
        self
    }
}

impl Default for InProcessQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Queue for InProcessQueue {
    async fn enqueue(&self, mut message: Message) -> Result<MessageId, QueueError> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        if state.closed {
            return Err(QueueError::Closed);
        }

        policy::prepare(&mut message, now, self.ids.as_ref());
        let id = message.id.clone();
        let due = message.is_due(now);
        let process_at = message.process_at.unwrap_or(now);
        debug!(message_id = %id, kind = %message.kind, due, "enqueue");
        state.messages.insert(id.clone(), message);

        if !due {
            state.delayed.push(Scheduled { process_at, id: id.clone() });
            return Ok(id);
        }

        match state.signal(id.clone()) {
            Ok(()) => Ok(id),
            Err(id) => {
                // Parked as due-now; the next dequeue with room signals it.
                warn!(message_id = %id, "ready channel full, message parked");
                state.delayed.push(Scheduled {
                    process_at: now,
                    id: id.clone(),
                });
                Err(QueueError::Saturated { id })
            }
        }
    }

    async fn dequeue(&self) -> Result<Option<Message>, QueueError> {
        let now = self.clock.now();
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.closed {
            return Ok(None);
        }
        state.promote_due(now);

        let mut ready_rx = self.ready_rx.lock().await;
        while let Ok(id) = ready_rx.try_recv() {
            let Some(message) = state.messages.get_mut(&id) else {
                debug!(message_id = %id, "signalled id has no message, skipping");
                continue;
            };
            if !message.is_ready(now) {
                if message.status == MessageStatus::Pending {
                    let process_at = message.process_at.unwrap_or(now);
                    state.delayed.push(Scheduled { process_at, id });
                } else {
                    debug!(message_id = %id, status = %message.status, "stale signal, skipping");
                }
                continue;
            }

            policy::claim(message);
            debug!(message_id = %id, attempt = message.attempts, "dequeue");
            return Ok(Some(message.clone()));
        }

        Ok(None)
    }

    async fn mark_completed(&self, id: &MessageId) -> Result<(), QueueError> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        let message = state
            .messages
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;

        if policy::complete(message)? {
            debug!(message_id = %id, "completed");
        }
        Ok(())
    }

    async fn mark_failed(&self, id: &MessageId) -> Result<(), QueueError> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        if state.closed {
            return Err(QueueError::Closed);
        }

        let (decision, attempts) = {
            let message = state
                .messages
                .get_mut(id)
                .ok_or_else(|| QueueError::NotFound(id.clone()))?;
            (policy::fail(&self.policy, message, now)?, message.attempts)
        };

        match decision {
            Decision::Retry { delay, process_at } => {
                info!(message_id = %id, attempts, delay_secs = delay.as_secs(), "retry scheduled");
                state.delayed.push(Scheduled {
                    process_at,
                    id: id.clone(),
                });
            }
            Decision::Fail => {
                warn!(message_id = %id, attempts, "attempts exhausted, message failed");
            }
        }
        Ok(())
    }

    /// Pending messages, whether signalled or still delayed. In-flight
    /// messages are not counted.
    async fn pending_count(&self) -> usize {
        let state = self.state.read().await;
        state
            .messages
            .values()
            .filter(|m| m.status == MessageStatus::Pending)
            .count()
    }

    async fn inspect(&self, id: &MessageId) -> Result<Option<Message>, QueueError> {
        let state = self.state.read().await;
        Ok(state.messages.get(id).cloned())
    }

    async fn close(&self) -> Result<(), QueueError> {
        let mut state = self.state.write().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.ready_tx = None;
        let cancelled = state.delayed.len();
        state.delayed.clear();
        info!(cancelled_retries = cancelled, "in-process queue closed");
        Ok(())
    }
}
