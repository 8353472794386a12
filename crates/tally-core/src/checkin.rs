//! Check-in workflow: the producer side of the queue.
//!
//! A punch toggles the employee between checked in and checked out. Check-out
//! closes the work session and enqueues the labor-cost report and the
//! hours notice. Enqueue failures are logged and never fail the check-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{EventKind, Message, WorkSession};
use crate::error::CheckinError;
use crate::ports::{Clock, SessionRepository, SystemClock};
use crate::queue::Queue;
use crate::tasks;

/// Result of one punch.
#[derive(Debug, Clone, PartialEq)]
pub enum Punch {
    CheckedIn(WorkSession),
    CheckedOut(WorkSession),
}

/// Snapshot of the queue backlog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    pub pending_messages: usize,
    pub timestamp: DateTime<Utc>,
}

pub struct CheckinService<R> {
    repository: R,
    queue: Arc<dyn Queue>,
    clock: Arc<dyn Clock>,
}

impl<R: SessionRepository> CheckinService<R> {
    pub fn new(repository: R, queue: Arc<dyn Queue>) -> Self {
        Self {
            repository,
            queue,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Check in, or check out if a session is already open.
    pub async fn process(&self, employee_id: &str) -> Result<Punch, CheckinError> {
        match self.repository.get_active_session(employee_id).await? {
            Some(session) => self.check_out(session).await.map(Punch::CheckedOut),
            None => self.check_in(employee_id).await.map(Punch::CheckedIn),
        }
    }

    pub async fn employee_status(
        &self,
        employee_id: &str,
    ) -> Result<Option<WorkSession>, CheckinError> {
        self.repository.get_active_session(employee_id).await
    }

    pub async fn queue_status(&self) -> QueueStatus {
        QueueStatus {
            pending_messages: self.queue.pending_count().await,
            timestamp: self.clock.now(),
        }
    }

    async fn check_in(&self, employee_id: &str) -> Result<WorkSession, CheckinError> {
        let now = self.clock.now();
        self.repository
            .create_event(employee_id, EventKind::Checkin, now)
            .await?;
        let session = self.repository.create_session(employee_id, now).await?;
        info!(employee_id, session_id = session.id, "checked in");
        Ok(session)
    }

    async fn check_out(&self, mut session: WorkSession) -> Result<WorkSession, CheckinError> {
        let now = self.clock.now();
        self.repository
            .create_event(&session.employee_id, EventKind::Checkout, now)
            .await?;
        let hours = session.check_out(now);
        self.repository.update_session(&session).await?;
        info!(
            employee_id = %session.employee_id,
            session_id = session.id,
            hours_worked = hours,
            "checked out"
        );

        let date = now.format("%Y-%m-%d").to_string();
        self.submit(tasks::labor_cost_report(&session.employee_id, hours, &date))
            .await;
        self.submit(tasks::email_notification(&session.employee_id, hours, &date))
            .await;
        Ok(session)
    }

    async fn submit(&self, message: Message) {
        let kind = message.kind.clone();
        if let Err(e) = self.queue.enqueue(message).await {
            warn!(kind = %kind, error = %e, "failed to enqueue task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageStatus, TaskKind};
    use crate::impls::InMemorySessionRepository;
    use crate::ports::FixedClock;
    use crate::queue::InProcessQueue;
    use crate::tasks::HoursPayload;
    use chrono::TimeZone;

    fn service() -> (CheckinService<InMemorySessionRepository>, Arc<InProcessQueue>, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let queue = Arc::new(InProcessQueue::new(16).with_clock(Arc::new(clock.clone())));
        let service = CheckinService::new(InMemorySessionRepository::new(), queue.clone())
            .with_clock(Arc::new(clock.clone()));
        (service, queue, clock)
    }

    #[tokio::test]
    async fn first_punch_checks_in_without_enqueueing() {
        let (service, queue, _clock) = service();

        let punch = service.process("E1").await.unwrap();

        let Punch::CheckedIn(session) = punch else {
            panic!("expected check-in, got {punch:?}");
        };
        assert!(session.is_active());
        assert_eq!(service.employee_status("E1").await.unwrap(), Some(session));
        assert_eq!(queue.pending_count().await, 0);
    }

    #[tokio::test]
    async fn second_punch_checks_out_and_enqueues_both_tasks() {
        let (service, queue, clock) = service();
        service.process("E1").await.unwrap();
        clock.advance(chrono::Duration::minutes(510));

        let Punch::CheckedOut(session) = service.process("E1").await.unwrap() else {
            panic!("expected check-out");
        };
        assert_eq!(session.hours_worked, Some(8.5));
        assert!(service.employee_status("E1").await.unwrap().is_none());
        assert_eq!(service.repository().events_for("E1").await.len(), 2);

        let status = service.queue_status().await;
        assert_eq!(status.pending_messages, 2);
        assert_eq!(status.timestamp, clock.now());

        let mut kinds = Vec::new();
        while let Some(msg) = queue.dequeue().await.unwrap() {
            assert_eq!(msg.status, MessageStatus::Processing);
            let hours = HoursPayload::from_payload(&msg.payload).unwrap();
            assert_eq!(hours, HoursPayload::new("E1", 8.5, "2024-01-01"));
            kinds.push(msg.kind);
        }
        assert_eq!(kinds, vec![TaskKind::LaborCostReport, TaskKind::EmailNotification]);
    }

    #[tokio::test]
    async fn enqueue_failure_does_not_fail_checkout() {
        let (service, queue, _clock) = service();
        service.process("E1").await.unwrap();
        queue.close().await.unwrap();

        let punch = service.process("E1").await.unwrap();

        assert!(matches!(punch, Punch::CheckedOut(_)));
        assert_eq!(queue.pending_count().await, 0);
    }

    #[test]
    fn queue_status_serializes_with_rfc3339_timestamp() {
        let status = QueueStatus {
            pending_messages: 3,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap(),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["pending_messages"], 3);
        assert_eq!(value["timestamp"], "2024-01-01T18:00:00Z");
    }
}
