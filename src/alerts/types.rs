//! Alert types

use crate::execution::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Order rejected by basic shape checks
    InvalidOrder,
    /// Order could not be valued: no price and no mark
    MissingPrice,
    /// Order arrived while its segment was closed
    MarketClosed,
    /// Breaker tripped
    CircuitBreakerTripped,
    /// Order arrived during a cool-off
    CircuitBreakerActive,
    /// Cool-off elapsed and the state was cleared
    CircuitBreakerReset,
    /// Projected exposure above a cap
    LimitBreached,
    /// Projected exposure near a cap
    LimitWarning,
    /// Order value above the large-order threshold
    LargeOrder,
    /// Too many orders in the trailing window
    RapidTrading,
    /// One instrument dominates the portfolio
    Concentration,
    /// Limits resolved from the conservative fallback
    ProfileFallback,
    /// A collaborator needed for the decision failed
    DependencyUnavailable,
}

/// An alert pushed to the audit/alerting collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identifier
    pub id: Uuid,
    /// Alert kind
    pub kind: AlertKind,
    /// Severity
    pub severity: Severity,
    /// Account concerned
    pub account_id: AccountId,
    /// Human-readable summary
    pub message: String,
    /// Structured details
    pub details: serde_json::Value,
    /// Emission time
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create an alert with empty details
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        account_id: impl Into<AccountId>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            account_id: account_id.into(),
            message: message.into(),
            details: serde_json::Value::Null,
            timestamp,
        }
    }

    /// Attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Alert delivery errors
#[derive(Debug, Error)]
pub enum AlertError {
    /// Bounded channel is full
    #[error("Alert channel full")]
    ChannelFull,
    /// Receiver dropped
    #[error("Alert channel closed")]
    ChannelClosed,
    /// Any other sink failure
    #[error("Alert sink failed: {0}")]
    Sink(String),
}
