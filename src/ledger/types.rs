//! Ledger types

use crate::execution::{AccountId, InstrumentKey};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Fill failed validation and was not applied
    #[error("Invalid fill {fill_id}: {reason}")]
    InvalidFill { fill_id: String, reason: String },
    /// Fill routed to the wrong account book
    #[error("Fill {fill_id} belongs to account {expected}, not {actual}")]
    AccountMismatch {
        fill_id: String,
        expected: AccountId,
        actual: AccountId,
    },
}

/// Net holding of one instrument for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Owning account
    pub account_id: AccountId,
    /// Instrument key
    pub instrument: InstrumentKey,
    /// Signed quantity (positive long, negative short)
    pub quantity: Decimal,
    /// Average entry price of the open quantity (zero when flat)
    pub average_price: Decimal,
    /// Latest known market price
    pub last_price: Decimal,
    /// Cumulative realized P&L, kept across flattenings
    pub realized_pnl: Decimal,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Create an empty position for a key
    pub fn flat(account_id: AccountId, instrument: InstrumentKey, at: DateTime<Utc>) -> Self {
        Self {
            account_id,
            instrument,
            quantity: Decimal::ZERO,
            average_price: Decimal::ZERO,
            last_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            updated_at: at,
        }
    }

    /// Whether the position has no open quantity
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Mark-to-market P&L on the open quantity
    pub fn unrealized_pnl(&self) -> Decimal {
        if self.is_flat() {
            return Decimal::ZERO;
        }
        self.quantity * (self.last_price - self.average_price)
    }

    /// Mark-to-market exposure, `|qty| * last_price`
    pub fn exposure(&self) -> Decimal {
        self.quantity.abs() * self.last_price
    }

    /// Signed mark-to-market value, `qty * last_price`
    pub fn signed_value(&self) -> Decimal {
        self.quantity * self.last_price
    }
}

/// Outcome of applying a fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    /// Position after the fill
    pub position: Position,
    /// Realized P&L produced by this fill
    pub realized: Decimal,
    /// True when the fill id had already been applied
    pub duplicate: bool,
}

/// Which exposure to measure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposureScope {
    /// A single instrument
    Instrument(InstrumentKey),
    /// All instruments of the account
    Total,
}

/// Exposure figures read for one order decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureSnapshot {
    /// Exposure of the order's instrument
    pub instrument: Decimal,
    /// Exposure across all instruments
    pub total: Decimal,
    /// Gross exposure across derivative products
    pub fno_gross: Decimal,
    /// Signed net value across derivative products
    pub fno_net: Decimal,
}

/// P&L summary for an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlSummary {
    /// Cumulative realized P&L
    pub realized: Decimal,
    /// Unrealized P&L on open quantity
    pub unrealized: Decimal,
    /// Realized plus unrealized
    pub total: Decimal,
    /// Total P&L change since the start of the trading day
    pub daily: Decimal,
}

/// Serializable ledger state of one account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// All positions, flat ones included
    pub positions: Vec<Position>,
    /// Applied fill ids (sorted)
    pub applied_fills: Vec<String>,
    /// Trading day the baseline belongs to
    pub trading_day: Option<NaiveDate>,
    /// Total P&L at the start of the trading day
    pub day_baseline: Decimal,
}
