use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::MessageId;
use crate::error::QueueError;
use crate::queue::Queue;
use crate::runtime::Runtime;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a single worker iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Completed(MessageId),
    /// The handler failed; the queue decided between retry and terminal
    /// failure.
    Failed(MessageId),
}

/// The single consumer: dequeue, dispatch, report the outcome, sleep.
pub struct Worker {
    queue: Arc<dyn Queue>,
    runtime: Arc<Runtime>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(queue: Arc<dyn Queue>, runtime: Arc<Runtime>) -> Self {
        Self {
            queue,
            runtime,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Process at most one message.
    pub async fn run_once(&self) -> Result<Tick, QueueError> {
        let Some(message) = self.queue.dequeue().await? else {
            return Ok(Tick::Idle);
        };
        let id = message.id.clone();
        debug!(message_id = %id, kind = %message.kind, attempt = message.attempts, "processing");

        match self.runtime.execute(&message).await {
            Ok(()) => {
                self.queue.mark_completed(&id).await?;
                info!(message_id = %id, kind = %message.kind, "task completed");
                Ok(Tick::Completed(id))
            }
            Err(err) => {
                warn!(
                    message_id = %id,
                    kind = %message.kind,
                    attempt = message.attempts,
                    max_attempts = message.max_attempts,
                    error = %err,
                    "task failed"
                );
                self.queue.mark_failed(&id).await?;
                Ok(Tick::Failed(id))
            }
        }
    }

    /// Loop until `cancel` fires. The token is checked before each
    /// iteration and raced against the sleep between them; an iteration
    /// already underway runs to completion.
    pub async fn run(self, cancel: CancellationToken) {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            if let Err(e) = self.run_once().await {
                error!(error = %e, "worker iteration failed");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!("worker stopped");
    }

    pub fn spawn(self) -> WorkerHandle {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(self.run(cancel.clone()));
        WorkerHandle { cancel, join }
    }
}

/// Handle to a spawned worker.
pub struct WorkerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Ask the worker to stop. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            error!(error = %e, "worker task panicked");
        }
    }

    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}
