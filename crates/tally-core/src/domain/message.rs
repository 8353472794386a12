//! The queued message and its task kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MessageId, MessageStatus};

/// Task-specific fields. The queue never looks inside; handlers validate.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Kind of work a message carries. Drives handler dispatch.
///
/// Unknown kinds are kept verbatim so they survive the wire and reach the
/// worker, which fails them like any other handler error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskKind {
    LaborCostReport,
    EmailNotification,
    Other(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::LaborCostReport => "labor_cost_report",
            TaskKind::EmailNotification => "email_notification",
            TaskKind::Other(kind) => kind,
        }
    }
}

impl From<String> for TaskKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "labor_cost_report" => TaskKind::LaborCostReport,
            "email_notification" => TaskKind::EmailNotification,
            _ => TaskKind::Other(value),
        }
    }
}

impl From<TaskKind> for String {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of background work.
///
/// This is also the wire record stored by the durable backends. Fields left
/// at their zero value (empty id, `max_attempts == 0`, missing timestamps)
/// are filled in by `enqueue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: MessageId,

    #[serde(rename = "type")]
    pub kind: TaskKind,

    #[serde(default)]
    pub payload: Payload,

    /// Number of deliveries so far (incremented on each dequeue).
    #[serde(default)]
    pub attempts: u32,

    #[serde(default)]
    pub max_attempts: u32,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Earliest instant the message may be delivered.
    #[serde(default)]
    pub process_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: MessageStatus,
}

impl Message {
    pub fn new(kind: TaskKind, payload: Payload, max_attempts: u32) -> Self {
        Self {
            id: MessageId::unassigned(),
            kind,
            payload,
            attempts: 0,
            max_attempts,
            created_at: None,
            process_at: None,
            status: MessageStatus::Pending,
        }
    }

    /// Delay the first delivery until `at`.
    pub fn with_process_at(mut self, at: DateTime<Utc>) -> Self {
        self.process_at = Some(at);
        self
    }

    /// A message with no `process_at` is due immediately.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.process_at.is_none_or(|at| at <= now)
    }

    /// Pending and due: eligible for dequeue.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status == MessageStatus::Pending && self.is_due(now)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Message {
        let payload = json!({"employee_id": "E1", "hours_worked": 8.5, "date": "2024-01-01"});
        let mut msg = Message::new(
            TaskKind::LaborCostReport,
            payload.as_object().cloned().unwrap(),
            5,
        );
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 17, 30, 0).unwrap();
        msg.id = MessageId::from("msg-1");
        msg.created_at = Some(at);
        msg.process_at = Some(at);
        msg
    }

    #[test]
    fn wire_form_uses_type_and_snake_case_kind() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["type"], "labor_cost_report");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["max_attempts"], 5);
        assert_eq!(value["created_at"], "2024-01-01T17:30:00Z");
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let msg = sample();
        let raw = msg.to_json().unwrap();
        assert_eq!(Message::from_json(raw.as_bytes()).unwrap(), msg);
    }

    #[test]
    fn unknown_kind_survives_the_wire() {
        let raw = br#"{"id":"x","type":"payroll_sync","payload":{}}"#;
        let msg = Message::from_json(raw).unwrap();
        assert_eq!(msg.kind, TaskKind::Other("payroll_sync".to_string()));
        assert_eq!(msg.status, MessageStatus::Pending);
        assert_eq!(msg.max_attempts, 0);

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["type"], "payroll_sync");
    }

    #[test]
    fn due_and_ready_follow_process_at() {
        let msg = sample();
        let at = msg.process_at.unwrap();
        assert!(msg.is_due(at));
        assert!(!msg.is_due(at - chrono::Duration::seconds(1)));

        let mut claimed = msg.clone();
        claimed.status = MessageStatus::Processing;
        assert!(!claimed.is_ready(at));

        let fresh = Message::new(TaskKind::EmailNotification, Payload::new(), 3);
        assert!(fresh.is_ready(at));
    }
}
