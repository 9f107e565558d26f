//! Notification sink trait and per-destination delivery reporting

use async_trait::async_trait;
use thiserror::Error;

use crate::LiveNotification;

/// Errors from delivering to a single destination
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Destination rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Destination discovery failed: {0}")]
    Discovery(String),

    #[error("No writable channel found")]
    NoWritableChannel,
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Outcome of delivering to one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationOutcome {
    /// Human-readable destination label (guild id, webhook host, ...)
    pub destination: String,
    pub error: Option<SinkError>,
}

impl DestinationOutcome {
    pub fn delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-destination results of one notification dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcomes: Vec<DestinationOutcome>,
}

impl DeliveryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, destination: impl Into<String>) {
        self.outcomes.push(DestinationOutcome {
            destination: destination.into(),
            error: None,
        });
    }

    pub fn record_failure(&mut self, destination: impl Into<String>, error: SinkError) {
        self.outcomes.push(DestinationOutcome {
            destination: destination.into(),
            error: Some(error),
        });
    }

    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.delivered_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &SinkError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| (o.destination.as_str(), e)))
    }
}

/// Delivers go-live announcements.
///
/// Implementations fan out to every destination they know about and never
/// let one destination's failure affect another. Failures are reported, not
/// returned.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &LiveNotification) -> DeliveryReport;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let mut report = DeliveryReport::new();
        report.record_success("guild:1");
        report.record_failure("guild:2", SinkError::NoWritableChannel);
        report.record_success("guild:3");

        assert_eq!(report.delivered_count(), 2);
        assert_eq!(report.failed_count(), 1);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures, vec![("guild:2", &SinkError::NoWritableChannel)]);
    }

    #[test]
    fn empty_report() {
        let report = DeliveryReport::new();
        assert_eq!(report.delivered_count(), 0);
        assert_eq!(report.failed_count(), 0);
    }
}
