//! Wiring: queue backend and handler runtime from a `Config`.

use std::sync::Arc;

use tracing::info;

use crate::config::{BackendConfig, Config};
use crate::error::{QueueError, RegistryError};
use crate::handlers::checkout_registry;
use crate::impls::{LoggingNotifier, LoggingReporter};
use crate::queue::{InProcessQueue, Queue, RetryPolicy};
use crate::runtime::Runtime;
use crate::worker::Worker;

/// Open the configured queue backend.
pub async fn connect_queue(config: &Config) -> Result<Arc<dyn Queue>, QueueError> {
    let policy = RetryPolicy::new(config.retry_unit);
    info!(backend = config.backend.name(), "opening queue backend");

    match &config.backend {
        BackendConfig::Memory { capacity } => {
            Ok(Arc::new(InProcessQueue::new(*capacity).with_policy(policy)))
        }

        #[cfg(feature = "redis")]
        BackendConfig::Redis { url, pop_timeout } => {
            let store = crate::impls::RedisStore::connect(url).await?;
            Ok(Arc::new(
                crate::queue::CacheQueue::new(store)
                    .with_pop_timeout(*pop_timeout)
                    .with_policy(policy),
            ))
        }
        #[cfg(not(feature = "redis"))]
        BackendConfig::Redis { .. } => Err(QueueError::Store(
            "redis support not compiled in".to_string(),
        )),

        #[cfg(feature = "amqp")]
        BackendConfig::Amqp { url, queue } => {
            let channel = crate::impls::AmqpChannel::connect(url, queue).await?;
            Ok(Arc::new(
                crate::queue::BrokerQueue::new(channel).with_policy(policy),
            ))
        }
        #[cfg(not(feature = "amqp"))]
        BackendConfig::Amqp { .. } => Err(QueueError::Broker(
            "amqp support not compiled in".to_string(),
        )),
    }
}

/// Runtime with the check-out handlers over the logging collaborators.
pub fn checkout_runtime(config: &Config) -> Result<Runtime, RegistryError> {
    let registry = checkout_registry(LoggingReporter::new(config.report_delay), LoggingNotifier)?;
    Ok(Runtime::new(Arc::new(registry)))
}

/// Worker over `queue` with the check-out handlers and the configured poll
/// interval.
pub fn checkout_worker(config: &Config, queue: Arc<dyn Queue>) -> Result<Worker, RegistryError> {
    let runtime = checkout_runtime(config)?;
    Ok(Worker::new(queue, Arc::new(runtime)).with_poll_interval(config.poll_interval))
}
