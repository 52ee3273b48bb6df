//! Risk controller types

use crate::breaker::{BreakerLevel, BreakerState};
use crate::execution::{AccountId, InstrumentKey, Order, Segment};
use crate::ledger::{LedgerError, PnlSummary};
use crate::limits::{LimitBreach, LimitProfile, LimitWarning, ProfileError};
use crate::market::ClosedReason;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from controller operations other than order validation
#[derive(Debug, Error)]
pub enum RiskError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckKind {
    OrderSanity,
    /// Account state loaded from the store
    AccountState,
    MarketTiming,
    CircuitBreaker,
    PositionLimits,
    LargeOrder,
    RapidTrading,
}

/// Outcome of one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub check: CheckKind,
    pub passed: bool,
    pub detail: String,
}

/// Why an order was denied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    /// Order failed shape checks
    InvalidOrder { reason: String },
    /// No order price and no mark to value the order at
    MissingPrice { instrument: InstrumentKey },
    /// Segment closed
    MarketClosed {
        segment: Segment,
        reason: ClosedReason,
        next_opening: Option<DateTime<Utc>>,
    },
    /// Account in breaker cool-off
    CircuitBreaker {
        level: BreakerLevel,
        cooloff_until: DateTime<Utc>,
        remaining_minutes: i64,
    },
    /// One or more exposure caps would be exceeded
    LimitBreached { breaches: Vec<LimitBreach> },
    /// Profile collaborator unavailable
    ProfileUnavailable { reason: String },
    /// Account state could not be loaded
    StateUnavailable { reason: String },
}

impl DenyReason {
    /// Short code for metrics
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::InvalidOrder { .. } => "invalid_order",
            DenyReason::MissingPrice { .. } => "missing_price",
            DenyReason::MarketClosed { .. } => "market_closed",
            DenyReason::CircuitBreaker { .. } => "circuit_breaker",
            DenyReason::LimitBreached { .. } => "limit_breached",
            DenyReason::ProfileUnavailable { .. } => "profile_unavailable",
            DenyReason::StateUnavailable { .. } => "state_unavailable",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::InvalidOrder { reason } => write!(f, "Invalid order: {reason}"),
            DenyReason::MissingPrice { instrument } => {
                write!(f, "No price available to value order on {instrument}")
            }
            DenyReason::MarketClosed {
                segment,
                reason,
                next_opening,
            } => {
                write!(f, "{segment} market closed: {reason}")?;
                if let Some(next) = next_opening {
                    write!(f, " (opens {next})")?;
                }
                Ok(())
            }
            DenyReason::CircuitBreaker {
                level,
                remaining_minutes,
                ..
            } => write!(
                f,
                "Circuit breaker {level} active, {remaining_minutes} min remaining"
            ),
            DenyReason::LimitBreached { breaches } => {
                let parts: Vec<String> = breaches.iter().map(ToString::to_string).collect();
                write!(f, "Limit breached: {}", parts.join("; "))
            }
            DenyReason::ProfileUnavailable { reason } => {
                write!(f, "Account profile unavailable: {reason}")
            }
            DenyReason::StateUnavailable { reason } => {
                write!(f, "Account state unavailable: {reason}")
            }
        }
    }
}

/// Non-blocking finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskWarning {
    /// Projected exposure near a cap
    LimitApproaching(LimitWarning),
    /// Order value above the large-order threshold
    LargeOrder { order_value: Decimal, threshold: Decimal },
    /// Order count in the trailing window at or above the threshold
    RapidTrading { orders: usize, window_secs: i64 },
    /// Limits came from the conservative fallback
    FallbackLimits,
}

impl fmt::Display for RiskWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskWarning::LimitApproaching(w) => write!(
                f,
                "{} exposure {} at {}% of cap {}",
                w.kind,
                w.projected,
                (w.utilization * Decimal::ONE_HUNDRED).round_dp(2),
                w.cap
            ),
            RiskWarning::LargeOrder {
                order_value,
                threshold,
            } => write!(f, "Large order: value {order_value} above {threshold}"),
            RiskWarning::RapidTrading {
                orders,
                window_secs,
            } => write!(f, "Rapid trading: {orders} orders in {window_secs}s"),
            RiskWarning::FallbackLimits => f.write_str("Conservative fallback limits applied"),
        }
    }
}

/// Result of validating one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Account the order belongs to
    pub account_id: AccountId,
    /// Caller's order reference
    pub client_order_id: Option<String>,
    /// Whether the order may be forwarded to a broker
    pub allowed: bool,
    /// Stage outcomes, in pipeline order
    pub checks: Vec<CheckRecord>,
    /// Non-blocking findings
    pub warnings: Vec<RiskWarning>,
    /// Blocking findings
    pub errors: Vec<DenyReason>,
    /// Order value used for the limit check
    pub order_value: Option<Decimal>,
    /// Decision time
    pub evaluated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub(crate) fn new(order: &Order, now: DateTime<Utc>) -> Self {
        Self {
            account_id: order.account_id.clone(),
            client_order_id: order.client_order_id.clone(),
            allowed: true,
            checks: vec![],
            warnings: vec![],
            errors: vec![],
            order_value: None,
            evaluated_at: now,
        }
    }

    pub(crate) fn pass(&mut self, check: CheckKind, detail: impl Into<String>) {
        self.checks.push(CheckRecord {
            check,
            passed: true,
            detail: detail.into(),
        });
    }

    pub(crate) fn deny(&mut self, check: CheckKind, reason: DenyReason) {
        self.checks.push(CheckRecord {
            check,
            passed: false,
            detail: reason.to_string(),
        });
        self.errors.push(reason);
        self.allowed = false;
    }

    /// The first deny reason, if any
    pub fn primary_reason(&self) -> Option<&DenyReason> {
        self.errors.first()
    }
}

/// Portfolio health rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthRating {
    Healthy,
    AtRisk,
    Critical,
}

/// One instrument holding too much of the portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationWarning {
    pub instrument: InstrumentKey,
    pub exposure: Decimal,
    /// exposure / total exposure
    pub share: Decimal,
}

/// Result of a portfolio health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHealth {
    pub account_id: AccountId,
    pub rating: HealthRating,
    pub pnl: PnlSummary,
    pub total_exposure: Decimal,
    /// Daily loss / daily loss cap
    pub loss_ratio: Decimal,
    pub limits: LimitProfile,
    /// Active breaker trip, including one tripped by this check
    pub breaker: Option<BreakerState>,
    pub concentration: Option<ConcentrationWarning>,
    pub evaluated_at: DateTime<Utc>,
}
