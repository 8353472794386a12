//! SessionRepository port - persistence for check-in events and work sessions.
//!
//! Plain CRUD; the relational store behind it is not part of this crate.
//! `InMemorySessionRepository` backs the binary and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CheckinEvent, EventKind, WorkSession};
use crate::error::CheckinError;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_active_session(
        &self,
        employee_id: &str,
    ) -> Result<Option<WorkSession>, CheckinError>;

    async fn create_event(
        &self,
        employee_id: &str,
        kind: EventKind,
        timestamp: DateTime<Utc>,
    ) -> Result<CheckinEvent, CheckinError>;

    /// Open a new active session for `employee_id`.
    async fn create_session(
        &self,
        employee_id: &str,
        checkin_time: DateTime<Utc>,
    ) -> Result<WorkSession, CheckinError>;

    async fn update_session(&self, session: &WorkSession) -> Result<(), CheckinError>;
}
