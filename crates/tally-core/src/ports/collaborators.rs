//! Downstream collaborators invoked by task handlers.

use async_trait::async_trait;

use crate::error::TaskError;

/// External labor-cost reporting endpoint (the legacy payroll system).
#[async_trait]
pub trait ReportingClient: Send + Sync {
    async fn report_hours(
        &self,
        employee_id: &str,
        hours_worked: f64,
        date: &str,
    ) -> Result<(), TaskError>;
}

/// Sends the "hours worked" notice to an employee.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_hours_notice(
        &self,
        employee_id: &str,
        hours_worked: f64,
        date: &str,
    ) -> Result<(), TaskError>;
}
