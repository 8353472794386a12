//! KeyValueStore port - the hash + list primitives of a cache service.
//!
//! The cache-backed queue only needs a handful of atomic operations: a hash
//! holding message blobs by id and a FIFO list of ready ids (push on the
//! left, pop on the right). Redis implements this natively; `MemoryStore`
//! implements it in process for tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// HSET key field value
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), QueueError>;

    /// HGET key field
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, QueueError>;

    /// LPUSH key value
    async fn list_push(&self, key: &str, value: &str) -> Result<(), QueueError>;

    /// BRPOP key timeout. Waits at most `timeout` for an element.
    async fn list_pop_blocking(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, QueueError>;

    /// LLEN key
    async fn list_len(&self, key: &str) -> Result<usize, QueueError>;

    /// Release the connection.
    async fn close(&self) -> Result<(), QueueError>;
}
