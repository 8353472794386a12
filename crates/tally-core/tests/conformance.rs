//! Contract tests run against every queue backend.
//!
//! Durable backends run over the in-process fakes of their ports. Each
//! backend declares which retry guarantees it offers; the shared contract is
//! asserted for all of them and the declared guarantees where they apply.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rstest::rstest;

use tally_core::domain::{Message, MessageId, MessageStatus, Payload, TaskKind};
use tally_core::error::{QueueError, TaskError};
use tally_core::handlers::checkout_registry;
use tally_core::impls::{MemoryBroker, MemoryStore};
use tally_core::ports::{Clock, FixedClock, Notifier, ReportingClient};
use tally_core::queue::{BrokerQueue, CacheQueue, InProcessQueue, Queue};
use tally_core::runtime::Runtime;
use tally_core::tasks;
use tally_core::worker::{Tick, Worker};

#[derive(Debug, Clone, Copy)]
enum Backend {
    InProcess,
    Cache,
    Broker,
}

struct Harness {
    queue: Arc<dyn Queue>,
    clock: FixedClock,
    /// A retried message stays invisible until its backoff elapses.
    honors_backoff: bool,
    /// A failed message with attempts left is delivered again.
    redelivers_failures: bool,
}

fn harness(backend: Backend) -> Harness {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap());
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());

    let (queue, honors_backoff, redelivers_failures): (Arc<dyn Queue>, bool, bool) = match backend {
        Backend::InProcess => (
            Arc::new(InProcessQueue::new(100).with_clock(shared)),
            true,
            true,
        ),
        Backend::Cache => (
            Arc::new(
                CacheQueue::new(MemoryStore::new())
                    .with_pop_timeout(Duration::from_millis(10))
                    .with_clock(shared),
            ),
            false,
            true,
        ),
        Backend::Broker => (
            Arc::new(BrokerQueue::new(MemoryBroker::new()).with_clock(shared)),
            false,
            false,
        ),
    };

    Harness {
        queue,
        clock,
        honors_backoff,
        redelivers_failures,
    }
}

fn bare(kind: TaskKind, max_attempts: u32) -> Message {
    Message::new(kind, Payload::new(), max_attempts)
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(String, f64, String)>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<(String, f64, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportingClient for Recorder {
    async fn report_hours(&self, e: &str, h: f64, d: &str) -> Result<(), TaskError> {
        self.calls.lock().unwrap().push((e.into(), h, d.into()));
        Ok(())
    }
}

#[async_trait]
impl Notifier for Recorder {
    async fn send_hours_notice(&self, e: &str, h: f64, d: &str) -> Result<(), TaskError> {
        self.calls.lock().unwrap().push((e.into(), h, d.into()));
        Ok(())
    }
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn enqueue_fills_defaults_and_dequeue_claims(#[case] backend: Backend) {
    let h = harness(backend);
    let id = h.queue.enqueue(bare(TaskKind::LaborCostReport, 0)).await.unwrap();
    assert!(id.is_assigned());

    let claimed = h.queue.dequeue().await.unwrap().unwrap();
    assert_eq!(claimed.id, id);
    assert_eq!(claimed.status, MessageStatus::Processing);
    assert_eq!(claimed.attempts, 1);
    assert_eq!(claimed.max_attempts, 5);
    assert_eq!(claimed.created_at, Some(h.clock.now()));
    assert_eq!(claimed.process_at, Some(h.clock.now()));

    assert!(h.queue.dequeue().await.unwrap().is_none());
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn pending_count_excludes_in_flight(#[case] backend: Backend) {
    let h = harness(backend);
    for _ in 0..3 {
        h.queue.enqueue(bare(TaskKind::EmailNotification, 3)).await.unwrap();
    }
    assert_eq!(h.queue.pending_count().await, 3);

    h.queue.dequeue().await.unwrap().unwrap();
    assert_eq!(h.queue.pending_count().await, 2);
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn completion_is_terminal_and_idempotent(#[case] backend: Backend) {
    let h = harness(backend);
    let id = h.queue.enqueue(bare(TaskKind::LaborCostReport, 5)).await.unwrap();
    h.queue.dequeue().await.unwrap().unwrap();

    h.queue.mark_completed(&id).await.unwrap();
    h.queue.mark_completed(&id).await.unwrap();

    let stored = h.queue.inspect(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, MessageStatus::Completed);
    assert_eq!(stored.attempts, 1);
    assert!(matches!(
        h.queue.mark_failed(&id).await,
        Err(QueueError::NotInFlight { status: MessageStatus::Completed, .. })
    ));
    assert!(h.queue.dequeue().await.unwrap().is_none());
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn unknown_ids_are_not_found(#[case] backend: Backend) {
    let h = harness(backend);
    let ghost = MessageId::from("ghost");

    assert!(matches!(
        h.queue.mark_completed(&ghost).await,
        Err(QueueError::NotFound(_))
    ));
    assert!(matches!(
        h.queue.mark_failed(&ghost).await,
        Err(QueueError::NotFound(_))
    ));
    assert!(h.queue.inspect(&ghost).await.unwrap().is_none());
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn failure_with_attempts_left_follows_declared_guarantees(#[case] backend: Backend) {
    let h = harness(backend);
    let start = h.clock.now();
    let id = h.queue.enqueue(bare(TaskKind::LaborCostReport, 5)).await.unwrap();
    h.queue.dequeue().await.unwrap().unwrap();

    h.queue.mark_failed(&id).await.unwrap();

    let stored = h.queue.inspect(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, MessageStatus::Pending);
    assert_eq!(stored.attempts, 1);
    assert_eq!(stored.process_at, Some(start + chrono::Duration::minutes(1)));

    let immediate = h.queue.dequeue().await.unwrap();
    if h.honors_backoff {
        assert!(immediate.is_none());
        h.clock.advance(chrono::Duration::minutes(1));
        let again = h.queue.dequeue().await.unwrap().unwrap();
        assert_eq!(again.attempts, 2);
    } else if h.redelivers_failures {
        let again = immediate.unwrap();
        assert_eq!(again.id, id);
        assert_eq!(again.attempts, 2);
    } else {
        assert!(immediate.is_none());
        h.clock.advance(chrono::Duration::hours(1));
        assert!(h.queue.dequeue().await.unwrap().is_none());
    }
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn exhausted_attempts_fail_terminally(#[case] backend: Backend) {
    let h = harness(backend);
    let id = h.queue.enqueue(bare(TaskKind::EmailNotification, 1)).await.unwrap();
    h.queue.dequeue().await.unwrap().unwrap();

    h.queue.mark_failed(&id).await.unwrap();

    let stored = h.queue.inspect(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, MessageStatus::Failed);
    h.clock.advance(chrono::Duration::hours(1));
    assert!(h.queue.dequeue().await.unwrap().is_none());
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn five_failures_walk_the_backoff_to_failed(#[case] backend: Backend) {
    let h = harness(backend);
    if !h.redelivers_failures {
        return;
    }
    let id = h
        .queue
        .enqueue(tasks::labor_cost_report("E1", 8.5, "2024-01-01"))
        .await
        .unwrap();
    let mut previous_process_at = h.clock.now();

    for attempt in 1..=5u32 {
        let claimed = h.queue.dequeue().await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.attempts, attempt);
        assert_eq!(claimed.max_attempts, 5);

        let failed_at = h.clock.now();
        h.queue.mark_failed(&id).await.unwrap();
        let stored = h.queue.inspect(&id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, attempt);

        if attempt == 5 {
            assert_eq!(stored.status, MessageStatus::Failed);
            break;
        }

        let backoff = chrono::Duration::minutes(i64::from(attempt * attempt));
        let process_at = stored.process_at.unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
        assert_eq!(process_at - failed_at, backoff);
        assert!(process_at > previous_process_at);
        previous_process_at = process_at;

        if h.honors_backoff {
            assert!(h.queue.dequeue().await.unwrap().is_none());
        }
        h.clock.advance(backoff);
    }

    h.clock.advance(chrono::Duration::days(1));
    assert!(h.queue.dequeue().await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_are_all_counted() {
    let h = harness(Backend::InProcess);
    let producers: Vec<_> = (0..4)
        .map(|n| {
            let queue = Arc::clone(&h.queue);
            tokio::spawn(async move {
                for _ in 0..10 {
                    let kind = if n % 2 == 0 {
                        TaskKind::LaborCostReport
                    } else {
                        TaskKind::EmailNotification
                    };
                    queue.enqueue(bare(kind, 3)).await.unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    assert_eq!(h.queue.pending_count().await, 40);
    let mut delivered = 0;
    while h.queue.dequeue().await.unwrap().is_some() {
        delivered += 1;
    }
    assert_eq!(delivered, 40);
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn closed_queue_rejects_work(#[case] backend: Backend) {
    let h = harness(backend);
    h.queue.close().await.unwrap();
    h.queue.close().await.unwrap();

    assert!(matches!(
        h.queue.enqueue(bare(TaskKind::LaborCostReport, 5)).await,
        Err(QueueError::Closed)
    ));
    assert!(h.queue.dequeue().await.unwrap().is_none());
    assert!(matches!(
        h.queue.mark_completed(&MessageId::from("any")).await,
        Err(QueueError::Closed)
    ));
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn checkout_report_reaches_payroll(#[case] backend: Backend) {
    let h = harness(backend);
    let reporter = Recorder::default();
    let notifier = Recorder::default();
    let registry = checkout_registry(reporter.clone(), notifier.clone()).unwrap();
    let worker = Worker::new(Arc::clone(&h.queue), Arc::new(Runtime::new(Arc::new(registry))));

    let id = h
        .queue
        .enqueue(tasks::labor_cost_report("E1", 8.5, "2024-01-01"))
        .await
        .unwrap();

    assert_eq!(worker.run_once().await.unwrap(), Tick::Completed(id.clone()));
    assert_eq!(
        reporter.calls(),
        vec![("E1".to_string(), 8.5, "2024-01-01".to_string())]
    );
    assert!(notifier.calls().is_empty());

    let stored = h.queue.inspect(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, MessageStatus::Completed);
    assert_eq!(worker.run_once().await.unwrap(), Tick::Idle);
}

#[rstest]
#[case::in_process(Backend::InProcess)]
#[case::cache(Backend::Cache)]
#[case::broker(Backend::Broker)]
#[tokio::test]
async fn malformed_payload_is_failed_not_dropped(#[case] backend: Backend) {
    let h = harness(backend);
    let reporter = Recorder::default();
    let registry = checkout_registry(reporter.clone(), Recorder::default()).unwrap();
    let worker = Worker::new(Arc::clone(&h.queue), Arc::new(Runtime::new(Arc::new(registry))));

    let id = h.queue.enqueue(bare(TaskKind::LaborCostReport, 1)).await.unwrap();

    assert_eq!(worker.run_once().await.unwrap(), Tick::Failed(id.clone()));
    assert!(reporter.calls().is_empty());
    let stored = h.queue.inspect(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, MessageStatus::Failed);
}
