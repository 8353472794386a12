//! Redis `KeyValueStore` over a multiplexed, auto-reconnecting connection.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use super::redact::redacted;
use crate::error::QueueError;
use crate::ports::KeyValueStore;

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Store(e.to_string())
    }
}

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        info!(url = %redacted(url), "connecting to redis");
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("redis connection ready");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.hget(key, field).await?)
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn list_pop_blocking(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn.brpop(key, timeout.as_secs_f64()).await?;
        Ok(popped.map(|(_, value)| value))
    }

    async fn list_len(&self, key: &str) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(key).await?)
    }

    /// The connection manager closes when its last clone is dropped.
    async fn close(&self) -> Result<(), QueueError> {
        debug!("redis store released");
        Ok(())
    }
}
