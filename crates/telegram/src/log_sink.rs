use async_trait::async_trait;
use funding_arb_core::{NotificationSink, NotifyError, Severity};

/// Sink for dry runs: every alert goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, severity: Severity, html: &str) -> Result<(), NotifyError> {
        tracing::info!(severity = severity.as_str(), message = %html, "Alert (not delivered)");
        Ok(())
    }
}
