//! Alert sink implementations

use super::types::{Alert, AlertError, Severity};
use super::AlertSink;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Writes alerts to the log at a level matching their severity
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn emit(&self, alert: Alert) -> Result<(), AlertError> {
        match alert.severity {
            Severity::Info => tracing::info!(
                account = %alert.account_id,
                kind = ?alert.kind,
                details = %alert.details,
                "{}", alert.message
            ),
            Severity::Warning => tracing::warn!(
                account = %alert.account_id,
                kind = ?alert.kind,
                details = %alert.details,
                "{}", alert.message
            ),
            Severity::Critical => tracing::error!(
                account = %alert.account_id,
                kind = ?alert.kind,
                details = %alert.details,
                "{}", alert.message
            ),
        }
        Ok(())
    }
}

/// Forwards alerts to a bounded tokio channel without blocking
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Alert>,
}

impl ChannelSink {
    /// Create a sink and its receiving end
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelSink {
    fn emit(&self, alert: Alert) -> Result<(), AlertError> {
        self.tx.try_send(alert).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AlertError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => AlertError::ChannelClosed,
        })
    }
}

/// Keeps alerts in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.alerts.lock())
    }

    /// Number of recorded alerts
    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for RecordingSink {
    fn emit(&self, alert: Alert) -> Result<(), AlertError> {
        self.alerts.lock().push(alert);
        Ok(())
    }
}
