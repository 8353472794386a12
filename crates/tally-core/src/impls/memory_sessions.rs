//! In-process `SessionRepository`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{CheckinEvent, EventKind, SessionStatus, WorkSession};
use crate::error::CheckinError;
use crate::ports::SessionRepository;

#[derive(Default)]
struct Tables {
    events: Vec<CheckinEvent>,
    sessions: HashMap<u64, WorkSession>,
    next_event_id: u64,
    next_session_id: u64,
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    tables: Mutex<Tables>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event recorded for `employee_id`, oldest first.
    pub async fn events_for(&self, employee_id: &str) -> Vec<CheckinEvent> {
        self.tables
            .lock()
            .await
            .events
            .iter()
            .filter(|e| e.employee_id == employee_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn get_active_session(
        &self,
        employee_id: &str,
    ) -> Result<Option<WorkSession>, CheckinError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.employee_id == employee_id && s.is_active())
            .max_by_key(|s| s.checkin_time)
            .cloned())
    }

    async fn create_event(
        &self,
        employee_id: &str,
        kind: EventKind,
        timestamp: DateTime<Utc>,
    ) -> Result<CheckinEvent, CheckinError> {
        let mut tables = self.tables.lock().await;
        tables.next_event_id += 1;
        let event = CheckinEvent {
            id: tables.next_event_id,
            employee_id: employee_id.to_string(),
            kind,
            timestamp,
        };
        tables.events.push(event.clone());
        Ok(event)
    }

    async fn create_session(
        &self,
        employee_id: &str,
        checkin_time: DateTime<Utc>,
    ) -> Result<WorkSession, CheckinError> {
        let mut tables = self.tables.lock().await;
        tables.next_session_id += 1;
        let session = WorkSession {
            id: tables.next_session_id,
            employee_id: employee_id.to_string(),
            checkin_time,
            checkout_time: None,
            hours_worked: None,
            status: SessionStatus::Active,
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn update_session(&self, session: &WorkSession) -> Result<(), CheckinError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| CheckinError::Repository(format!("session {} not found", session.id)))?;
        *stored = session.clone();
        Ok(())
    }
}
