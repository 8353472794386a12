//! In-process `BrokerChannel`: a FIFO of bodies, acknowledged on fetch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::QueueError;
use crate::ports::BrokerChannel;

#[derive(Default)]
struct Inner {
    ready: Mutex<VecDeque<Vec<u8>>>,
    published: AtomicUsize,
    closed: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total publishes since creation.
    pub fn published(&self) -> usize {
        self.inner.published.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Broker("channel closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerChannel for MemoryBroker {
    async fn publish(&self, body: &[u8]) -> Result<(), QueueError> {
        self.ensure_open()?;
        self.inner
            .ready
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(body.to_vec());
        self.inner.published.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<Vec<u8>>, QueueError> {
        self.ensure_open()?;
        Ok(self
            .inner
            .ready
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front())
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        self.ensure_open()?;
        Ok(self
            .inner
            .ready
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len())
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }
}
