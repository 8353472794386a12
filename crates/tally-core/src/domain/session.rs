//! Work sessions and check-in events recorded by the producing workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Checkin,
    Checkout,
}

/// A single check-in or check-out punch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinEvent {
    pub id: u64,
    pub employee_id: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// A check-in paired with its (eventual) check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: u64,
    pub employee_id: String,
    pub checkin_time: DateTime<Utc>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub hours_worked: Option<f64>,
    pub status: SessionStatus,
}

impl WorkSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Close the session at `at`, returning the fractional hours worked.
    pub fn check_out(&mut self, at: DateTime<Utc>) -> f64 {
        let hours = (at - self.checkin_time).num_milliseconds() as f64 / 3_600_000.0;
        self.checkout_time = Some(at);
        self.hours_worked = Some(hours);
        self.status = SessionStatus::Completed;
        hours
    }
}
