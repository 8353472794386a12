//! In-process `KeyValueStore` with the hash and list semantics the cache
//! queue relies on. Clones share the same data.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::QueueError;
use crate::ports::KeyValueStore;

#[derive(Default)]
struct Data {
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, VecDeque<String>>,
}

#[derive(Default)]
struct Inner {
    data: Mutex<Data>,
    pushed: Notify,
    closed: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn data(&self) -> Result<MutexGuard<'_, Data>, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Store("connection closed".to_string()));
        }
        Ok(self.inner.data.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn pop_right(&self, key: &str) -> Result<Option<String>, QueueError> {
        Ok(self.data()?.lists.get_mut(key).and_then(VecDeque::pop_back))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), QueueError> {
        self.data()?
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, QueueError> {
        Ok(self
            .data()?
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), QueueError> {
        self.data()?
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        self.inner.pushed.notify_waiters();
        Ok(())
    }

    async fn list_pop_blocking(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Registered before the check so a push in between is not missed.
            let pushed = self.inner.pushed.notified();
            if let Some(value) = self.pop_right(key)? {
                return Ok(Some(value));
            }
            if tokio::time::timeout_at(deadline, pushed).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize, QueueError> {
        Ok(self.data()?.lists.get(key).map_or(0, VecDeque::len))
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.pushed.notify_waiters();
        Ok(())
    }
}
