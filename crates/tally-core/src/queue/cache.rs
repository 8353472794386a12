//! Cache-backed queue: message blobs in a hash, ready ids in a list.
//!
//! Enqueue writes the serialized message under its id and pushes the id on
//! the left of the ready list; dequeue blocks on a right pop for at most
//! `pop_timeout`. Every mutation re-serializes the whole message.
//!
//! This backend does not honor `process_at`. A failed message with attempts
//! left is pushed back onto the ready list immediately, so the next dequeue
//! may deliver it before its backoff has elapsed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::Queue;
use super::policy::{self, Decision, RetryPolicy};
use crate::domain::{Message, MessageId, MessageStatus};
use crate::error::QueueError;
use crate::ports::{Clock, IdGenerator, KeyValueStore, SystemClock, UlidGenerator};

pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_secs(1);

/// Key names used on the store.
#[derive(Debug, Clone)]
pub struct CacheKeys {
    /// Hash: message id -> serialized message.
    pub messages: String,

    /// List of ready ids (LPUSH / BRPOP).
    pub pending: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self {
            messages: "messages".to_string(),
            pending: "pending".to_string(),
        }
    }
}

pub struct CacheQueue<S> {
    store: S,
    keys: CacheKeys,
    pop_timeout: Duration,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    closed: AtomicBool,
}

impl<S: KeyValueStore> CacheQueue<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            keys: CacheKeys::default(),
            pop_timeout: DEFAULT_POP_TIMEOUT,
            policy: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_keys(mut self, keys: CacheKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_pop_timeout(mut self, timeout: Duration) -> Self {
        self.pop_timeout = timeout;
        self
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

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        Ok(())
    }

    async fn load(&self, id: &MessageId) -> Result<Option<Message>, QueueError> {
        let raw = self.store.hash_get(&self.keys.messages, id.as_str()).await?;
        let message = raw.map(|raw| Message::from_json(raw.as_bytes())).transpose()?;
        Ok(message)
    }

    async fn save(&self, message: &Message) -> Result<(), QueueError> {
        let raw = message.to_json()?;
        self.store
            .hash_set(&self.keys.messages, message.id.as_str(), &raw)
            .await
    }
}

#[async_trait]
impl<S: KeyValueStore> Queue for CacheQueue<S> {
    async fn enqueue(&self, mut message: Message) -> Result<MessageId, QueueError> {
        self.ensure_open()?;
        policy::prepare(&mut message, self.clock.now(), self.ids.as_ref());

        self.save(&message).await?;
        self.store
            .list_push(&self.keys.pending, message.id.as_str())
            .await?;
        debug!(message_id = %message.id, kind = %message.kind, "enqueue");
        Ok(message.id)
    }

    async fn dequeue(&self) -> Result<Option<Message>, QueueError> {
        if self.is_closed() {
            return Ok(None);
        }

        let Some(raw_id) = self
            .store
            .list_pop_blocking(&self.keys.pending, self.pop_timeout)
            .await?
        else {
            return Ok(None);
        };
        let id = MessageId::from(raw_id);

        let Some(mut message) = self.load(&id).await? else {
            debug!(message_id = %id, "ready id has no stored message, skipping");
            return Ok(None);
        };
        if message.status != MessageStatus::Pending {
            debug!(message_id = %id, status = %message.status, "stale ready id, skipping");
            return Ok(None);
        }

        policy::claim(&mut message);
        self.save(&message).await?;
        debug!(message_id = %id, attempt = message.attempts, "dequeue");
        Ok(Some(message))
    }

    async fn mark_completed(&self, id: &MessageId) -> Result<(), QueueError> {
        self.ensure_open()?;
        let mut message = self
            .load(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;

        if policy::complete(&mut message)? {
            self.save(&message).await?;
            debug!(message_id = %id, "completed");
        }
        Ok(())
    }

    async fn mark_failed(&self, id: &MessageId) -> Result<(), QueueError> {
        self.ensure_open()?;
        let mut message = self
            .load(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;

        let decision = policy::fail(&self.policy, &mut message, self.clock.now())?;
        self.save(&message).await?;

        match decision {
            Decision::Retry { delay, .. } => {
                self.store.list_push(&self.keys.pending, id.as_str()).await?;
                info!(
                    message_id = %id,
                    attempts = message.attempts,
                    delay_secs = delay.as_secs(),
                    "retry re-queued immediately, backoff not enforced by this backend"
                );
            }
            Decision::Fail => {
                warn!(message_id = %id, attempts = message.attempts, "attempts exhausted, message failed");
            }
        }
        Ok(())
    }

    /// Length of the ready list. Popped (in-flight) ids are not on it.
    async fn pending_count(&self) -> usize {
        match self.store.list_len(&self.keys.pending).await {
            Ok(len) => len,
            Err(e) => {
                warn!(error = %e, "failed to read pending count");
                0
            }
        }
    }

    async fn inspect(&self, id: &MessageId) -> Result<Option<Message>, QueueError> {
        self.load(id).await
    }

    async fn close(&self) -> Result<(), QueueError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.store.close().await?;
        info!("cache queue closed");
        Ok(())
    }
}
