//! Broker-backed queue: one durable queue, persistent publishes, fetch with
//! acknowledge-on-receipt.
//!
//! The broker forgets a message as soon as it is fetched, so outcome
//! reporting only touches a process-local ledger of delivered copies.
//! Failures are recorded but never resubmitted: a failed message with
//! attempts left stays Pending in the ledger and is not delivered again.
//! A crash between fetch and completion loses the message.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::Queue;
use super::policy::{self, Decision, RetryPolicy};
use crate::domain::{Message, MessageId};
use crate::error::QueueError;
use crate::ports::{BrokerChannel, Clock, IdGenerator, SystemClock, UlidGenerator};

/// Queue name used when none is configured.
pub const DEFAULT_QUEUE_NAME: &str = "factory_checkin_tasks";

/// Broker-backed queue implementation.
///
/// The ledger holds one entry per delivered message for the life of the
/// process, terminal ones included, so a repeated completion stays a no-op.
/// Long-running processes call `prune_terminal` to drop finished entries.
pub struct BrokerQueue<C> {
    channel: C,
    ledger: Mutex<HashMap<MessageId, Message>>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    closed: AtomicBool,
}

impl<C: BrokerChannel> BrokerQueue<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            ledger: Mutex::new(HashMap::new()),
            policy: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        self.clock = clock;
        self
    }

    /// Drop Completed and Failed copies from the ledger. Outcomes reported
    /// for a pruned id afterwards are `NotFound`. Returns how many were
    /// dropped.
    pub async fn prune_terminal(&self) -> usize {
        let mut ledger = self.ledger.lock().await;
        let before = ledger.len();
        ledger.retain(|_, message| !message.status.is_terminal());
        let pruned = before - ledger.len();
        debug!(pruned, remaining = ledger.len(), "ledger pruned");
        pruned
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl<C: BrokerChannel> Queue for BrokerQueue<C> {
    async fn enqueue(&self, mut message: Message) -> Result<MessageId, QueueError> {
        self.ensure_open()?;
        policy::prepare(&mut message, self.clock.now(), self.ids.as_ref());

        let body = serde_json::to_vec(&message)?;
        self.channel.publish(&body).await?;
        debug!(message_id = %message.id, kind = %message.kind, "published");
        Ok(message.id)
    }

    async fn dequeue(&self) -> Result<Option<Message>, QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }

        let Some(body) = self.channel.fetch().await? else {
            return Ok(None);
        };
        // Already acknowledged: a body that fails to decode is gone.
        let mut message = Message::from_json(&body)?;

        policy::claim(&mut message);
        self.ledger
            .lock()
            .await
            .insert(message.id.clone(), message.clone());
        debug!(message_id = %message.id, attempt = message.attempts, "delivered");
        Ok(Some(message))
    }

    async fn mark_completed(&self, id: &MessageId) -> Result<(), QueueError> {
        self.ensure_open()?;
        let mut ledger = self.ledger.lock().await;
        let message = ledger
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;

        if policy::complete(message)? {
            debug!(message_id = %id, "completed");
        }
        Ok(())
    }

    async fn mark_failed(&self, id: &MessageId) -> Result<(), QueueError> {
        self.ensure_open()?;
        let mut ledger = self.ledger.lock().await;
        let message = ledger
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;

        match policy::fail(&self.policy, message, self.clock.now())? {
            Decision::Retry { .. } => warn!(
                message_id = %id,
                attempts = message.attempts,
                "failure recorded, broker backend does not redeliver"
            ),
            Decision::Fail => warn!(
                message_id = %id,
                attempts = message.attempts,
                "attempts exhausted, message failed"
            ),
        }
        Ok(())
    }

    /// Messages waiting on the broker queue. Fetched messages are gone from
    /// it and not counted.
    async fn pending_count(&self) -> usize {
        match self.channel.depth().await {
            Ok(depth) => depth,
            Err(e) => {
                warn!(error = %e, "failed to inspect broker queue depth");
                0
            }
        }
    }

    /// Ledger copy of a delivered message. Messages still on the broker are
    /// not visible here.
    async fn inspect(&self, id: &MessageId) -> Result<Option<Message>, QueueError> {
        Ok(self.ledger.lock().await.get(id).cloned())
    }

    async fn close(&self) -> Result<(), QueueError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.channel.close().await?;
        info!("broker queue closed");
        Ok(())
    }
}
