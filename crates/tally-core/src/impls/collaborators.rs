//! Logging stand-ins for the downstream systems.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::TaskError;
use crate::ports::{Notifier, ReportingClient};

/// Reporting client that logs the call and waits `delay` to mimic the
/// latency of the legacy payroll endpoint.
#[derive(Debug, Clone)]
pub struct LoggingReporter {
    delay: Duration,
}

impl LoggingReporter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl ReportingClient for LoggingReporter {
    async fn report_hours(
        &self,
        employee_id: &str,
        hours_worked: f64,
        date: &str,
    ) -> Result<(), TaskError> {
        info!(employee_id, hours_worked, date, "reporting labor cost");
        tokio::time::sleep(self.delay).await;
        info!(employee_id, "labor cost reported");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_hours_notice(
        &self,
        employee_id: &str,
        hours_worked: f64,
        date: &str,
    ) -> Result<(), TaskError> {
        info!(
            employee_id,
            hours_worked,
            date,
            "sending hours notice: you worked {hours_worked:.2} hours on {date}"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reporter_waits_for_configured_delay() {
        let reporter = LoggingReporter::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();

        reporter.report_hours("E1", 8.5, "2024-01-01").await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
