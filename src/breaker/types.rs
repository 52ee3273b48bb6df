//! Circuit breaker types

use crate::execution::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trip level, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BreakerLevel {
    #[serde(rename = "LEVEL_1")]
    Level1,
    #[serde(rename = "LEVEL_2")]
    Level2,
    #[serde(rename = "LEVEL_3")]
    Level3,
}

impl fmt::Display for BreakerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BreakerLevel::Level1 => "LEVEL_1",
            BreakerLevel::Level2 => "LEVEL_2",
            BreakerLevel::Level3 => "LEVEL_3",
        };
        f.write_str(s)
    }
}

/// Active trip of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerState {
    /// Tripped account
    pub account_id: AccountId,
    /// Level selected at trip time
    pub level: BreakerLevel,
    /// Loss ratio that caused the trip
    pub loss_ratio: Decimal,
    /// When the breaker tripped
    pub tripped_at: DateTime<Utc>,
    /// Trading resumes at this instant
    pub cooloff_until: DateTime<Utc>,
}

/// Answer to "may this account trade now?"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerStatus {
    /// Trading allowed; `cleared` names a trip resolved by this call
    Allowed { cleared: Option<BreakerLevel> },
    /// Still inside a cool-off
    CoolingOff {
        level: BreakerLevel,
        cooloff_until: DateTime<Utc>,
        remaining_minutes: i64,
    },
}

impl BreakerStatus {
    /// Whether new orders may be accepted
    pub fn is_allowed(&self) -> bool {
        matches!(self, BreakerStatus::Allowed { .. })
    }
}
