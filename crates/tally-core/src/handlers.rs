//! Handlers for the check-out task kinds.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::{Message, TaskKind};
use crate::error::{RegistryError, TaskError};
use crate::ports::{Notifier, ReportingClient};
use crate::runtime::{HandlerRegistry, TaskHandler};
use crate::tasks::HoursPayload;

/// Sends `labor_cost_report` messages to the reporting client.
pub struct LaborCostHandler<R> {
    reporter: R,
}

impl<R: ReportingClient> LaborCostHandler<R> {
    pub fn new(reporter: R) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl<R: ReportingClient> TaskHandler for LaborCostHandler<R> {
    async fn handle(&self, message: &Message) -> Result<(), TaskError> {
        let hours = HoursPayload::from_payload(&message.payload)?;
        info!(
            message_id = %message.id,
            employee_id = %hours.employee_id,
            "processing labor cost report"
        );
        self.reporter
            .report_hours(&hours.employee_id, hours.hours_worked, &hours.date)
            .await
    }
}

/// Sends `email_notification` messages through the notifier.
pub struct NotificationHandler<N> {
    notifier: N,
}

impl<N: Notifier> NotificationHandler<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl<N: Notifier> TaskHandler for NotificationHandler<N> {
    async fn handle(&self, message: &Message) -> Result<(), TaskError> {
        let hours = HoursPayload::from_payload(&message.payload)?;
        info!(
            message_id = %message.id,
            employee_id = %hours.employee_id,
            "processing email notification"
        );
        self.notifier
            .send_hours_notice(&hours.employee_id, hours.hours_worked, &hours.date)
            .await
    }
}

/// Registry with both check-out handlers.
pub fn checkout_registry<R, N>(reporter: R, notifier: N) -> Result<HandlerRegistry, RegistryError>
where
    R: ReportingClient + 'static,
    N: Notifier + 'static,
{
    let mut registry = HandlerRegistry::new();
    registry.register(
        TaskKind::LaborCostReport,
        Arc::new(LaborCostHandler::new(reporter)),
    )?;
    registry.register(
        TaskKind::EmailNotification,
        Arc::new(NotificationHandler::new(notifier)),
    )?;
    Ok(registry)
}
