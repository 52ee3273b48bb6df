//! Market timing types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a segment is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosedReason {
    /// Saturday or Sunday
    Weekend,
    /// Configured exchange holiday
    Holiday,
    /// Trading day, but outside every session window
    OutsideSession,
    /// No session windows configured for the segment
    NoSessions,
}

impl fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClosedReason::Weekend => "weekend",
            ClosedReason::Holiday => "exchange holiday",
            ClosedReason::OutsideSession => "outside trading session",
            ClosedReason::NoSessions => "no sessions configured",
        };
        f.write_str(s)
    }
}

/// Market status for a segment at an instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatus {
    /// Whether orders may be accepted
    pub open: bool,
    /// Name of the active session when open
    pub session: Option<String>,
    /// Why the market is closed
    pub reason: Option<ClosedReason>,
    /// Next session start when closed
    pub next_opening: Option<DateTime<Utc>>,
}

impl MarketStatus {
    /// Open in `session`
    pub fn open(session: &str) -> Self {
        Self {
            open: true,
            session: Some(session.to_string()),
            reason: None,
            next_opening: None,
        }
    }

    /// Closed for `reason`
    pub fn closed(reason: ClosedReason, next_opening: Option<DateTime<Utc>>) -> Self {
        Self {
            open: false,
            session: None,
            reason: Some(reason),
            next_opening,
        }
    }
}

/// Calendar configuration errors
#[derive(Debug, Error)]
pub enum CalendarError {
    /// UTC offset outside +/- 24h
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),
    /// Session window that ends before it starts
    #[error("Invalid session window {name}: start {start} is not before end {end}")]
    InvalidWindow {
        name: String,
        start: String,
        end: String,
    },
}
