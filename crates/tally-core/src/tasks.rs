//! Task factory: the two message kinds produced at check-out, and the
//! payload they carry.

use serde::{Deserialize, Serialize};

use crate::domain::{Message, Payload, TaskKind};
use crate::error::TaskError;

pub const LABOR_COST_MAX_ATTEMPTS: u32 = 5;
pub const NOTIFICATION_MAX_ATTEMPTS: u32 = 3;

/// Hours worked by one employee on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursPayload {
    pub employee_id: String,
    pub hours_worked: f64,
    /// `YYYY-MM-DD`
    pub date: String,
}

impl HoursPayload {
    pub fn new(employee_id: impl Into<String>, hours_worked: f64, date: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            hours_worked,
            date: date.into(),
        }
    }

    /// Validate an untyped payload. Missing or mistyped fields are a
    /// `MalformedPayload` error.
    pub fn from_payload(payload: &Payload) -> Result<Self, TaskError> {
        serde_json::from_value(serde_json::Value::Object(payload.clone()))
            .map_err(|e| TaskError::MalformedPayload(e.to_string()))
    }

    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("employee_id".into(), self.employee_id.into());
        payload.insert("hours_worked".into(), self.hours_worked.into());
        payload.insert("date".into(), self.date.into());
        payload
    }
}

/// Labor-cost report for the payroll system. Retried up to 5 attempts.
pub fn labor_cost_report(employee_id: &str, hours_worked: f64, date: &str) -> Message {
    Message::new(
        TaskKind::LaborCostReport,
        HoursPayload::new(employee_id, hours_worked, date).into_payload(),
        LABOR_COST_MAX_ATTEMPTS,
    )
}

/// Hours-worked notice for the employee. Retried up to 3 attempts.
pub fn email_notification(employee_id: &str, hours_worked: f64, date: &str) -> Message {
    Message::new(
        TaskKind::EmailNotification,
        HoursPayload::new(employee_id, hours_worked, date).into_payload(),
        NOTIFICATION_MAX_ATTEMPTS,
    )
}
