//! Position limit validation
//!
//! Pure function of (exposure snapshot, limits, order): the same inputs always
//! produce the same decision, so audits can replay it.

use super::types::LimitProfile;
use crate::execution::Order;
use crate::ledger::ExposureSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which cap a projection was checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitKind {
    SingleInstrument,
    Aggregate,
    FnoGross,
    FnoNet,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitKind::SingleInstrument => "single instrument",
            LimitKind::Aggregate => "aggregate",
            LimitKind::FnoGross => "F&O gross",
            LimitKind::FnoNet => "F&O net",
        };
        f.write_str(s)
    }
}

/// Projected exposure exceeding a cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitBreach {
    pub kind: LimitKind,
    pub projected: Decimal,
    pub cap: Decimal,
}

impl fmt::Display for LimitBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exposure {} exceeds cap {}",
            self.kind, self.projected, self.cap
        )
    }
}

/// Projected exposure approaching a cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitWarning {
    pub kind: LimitKind,
    pub projected: Decimal,
    pub cap: Decimal,
    /// projected / cap
    pub utilization: Decimal,
}

/// Result of a limit check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub breaches: Vec<LimitBreach>,
    pub warnings: Vec<LimitWarning>,
}

/// Checks orders against resolved limits
#[derive(Debug, Clone)]
pub struct LimitValidator {
    warning_ratio: Decimal,
}

impl LimitValidator {
    /// Create a validator warning at `warning_ratio` of each cap
    pub fn new(warning_ratio: Decimal) -> Self {
        Self { warning_ratio }
    }

    /// Check an order worth `order_value` against `limits`.
    ///
    /// Breach when a projection is strictly above its cap; warning when it is
    /// at or above the warning ratio without breaching.
    pub fn validate(
        &self,
        snapshot: &ExposureSnapshot,
        limits: &LimitProfile,
        order: &Order,
        order_value: Decimal,
    ) -> LimitCheck {
        let mut projections = vec![
            (
                LimitKind::SingleInstrument,
                snapshot.instrument + order_value,
                limits.single_instrument_cap,
            ),
            (
                LimitKind::Aggregate,
                snapshot.total + order_value,
                limits.aggregate_cap,
            ),
        ];

        if order.instrument.product.is_derivative() {
            let signed_value = order_value * order.side.sign();
            projections.push((
                LimitKind::FnoGross,
                snapshot.fno_gross + order_value,
                limits.fno_gross_cap,
            ));
            projections.push((
                LimitKind::FnoNet,
                (snapshot.fno_net + signed_value).abs(),
                limits.fno_net_cap,
            ));
        }

        let mut check = LimitCheck {
            allowed: true,
            ..Default::default()
        };
        for (kind, projected, cap) in projections {
            if projected > cap {
                check.breaches.push(LimitBreach {
                    kind,
                    projected,
                    cap,
                });
            } else if cap > Decimal::ZERO && projected >= cap * self.warning_ratio {
                check.warnings.push(LimitWarning {
                    kind,
                    projected,
                    cap,
                    utilization: (projected / cap).round_dp(4),
                });
            }
        }
        check.allowed = check.breaches.is_empty();
        check
    }
}
