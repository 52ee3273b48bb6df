//! Single-account position book

use super::types::{
    ExposureScope, ExposureSnapshot, FillResult, LedgerError, LedgerSnapshot, PnlSummary,
    Position,
};
use crate::execution::{AccountId, Fill, InstrumentKey};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

/// Positions and fill history of one account.
///
/// Not thread-safe on its own; [`super::PositionLedger`] wraps each book in a
/// mutex so fills and reads for one account are serialized.
#[derive(Debug, Clone)]
pub struct AccountBook {
    account_id: AccountId,
    positions: BTreeMap<InstrumentKey, Position>,
    applied_fills: HashSet<String>,
    trading_day: Option<NaiveDate>,
    day_baseline: Decimal,
}

impl AccountBook {
    /// Create an empty book
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            positions: BTreeMap::new(),
            applied_fills: HashSet::new(),
            trading_day: None,
            day_baseline: Decimal::ZERO,
        }
    }

    /// Rebuild a book from a persisted snapshot
    pub fn from_snapshot(account_id: impl Into<AccountId>, snapshot: LedgerSnapshot) -> Self {
        let account_id = account_id.into();
        let positions = snapshot
            .positions
            .into_iter()
            .filter(|p| p.account_id == account_id)
            .map(|p| (p.instrument.clone(), p))
            .collect();
        Self {
            account_id,
            positions,
            applied_fills: snapshot.applied_fills.into_iter().collect(),
            trading_day: snapshot.trading_day,
            day_baseline: snapshot.day_baseline,
        }
    }

    /// Account this book belongs to
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Apply a fill, idempotent on `fill_id`
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<FillResult, LedgerError> {
        if fill.account_id != self.account_id {
            return Err(LedgerError::AccountMismatch {
                fill_id: fill.fill_id.clone(),
                expected: self.account_id.clone(),
                actual: fill.account_id.clone(),
            });
        }
        if fill.quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidFill {
                fill_id: fill.fill_id.clone(),
                reason: format!("quantity must be positive, got {}", fill.quantity),
            });
        }
        if fill.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidFill {
                fill_id: fill.fill_id.clone(),
                reason: format!("price must be positive, got {}", fill.price),
            });
        }

        if self.applied_fills.contains(&fill.fill_id) {
            let position = self.positions.get(&fill.instrument).cloned().unwrap_or_else(|| {
                Position::flat(self.account_id.clone(), fill.instrument.clone(), fill.timestamp)
            });
            tracing::debug!(fill_id = %fill.fill_id, "Duplicate fill ignored");
            return Ok(FillResult {
                position,
                realized: Decimal::ZERO,
                duplicate: true,
            });
        }

        self.roll_day(fill.timestamp.date_naive());

        let account_id = self.account_id.clone();
        let position = self
            .positions
            .entry(fill.instrument.clone())
            .or_insert_with(|| Position::flat(account_id, fill.instrument.clone(), fill.timestamp));

        let realized = apply_to_position(position, fill);
        let position = position.clone();
        self.applied_fills.insert(fill.fill_id.clone());

        tracing::debug!(
            account = %self.account_id,
            instrument = %fill.instrument,
            fill_id = %fill.fill_id,
            quantity = %position.quantity,
            average_price = %position.average_price,
            realized = %realized,
            "Fill applied"
        );

        Ok(FillResult {
            position,
            realized,
            duplicate: false,
        })
    }

    /// Set the externally supplied last price for an instrument
    pub fn update_mark(
        &mut self,
        instrument: &InstrumentKey,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> Option<Position> {
        let position = self.positions.get_mut(instrument)?;
        position.last_price = price;
        position.updated_at = at;
        Some(position.clone())
    }

    /// Latest known price for an instrument
    pub fn last_price(&self, instrument: &InstrumentKey) -> Option<Decimal> {
        self.positions
            .get(instrument)
            .map(|p| p.last_price)
            .filter(|p| *p > Decimal::ZERO)
    }

    /// Position for an instrument, if one was ever opened
    pub fn position(&self, instrument: &InstrumentKey) -> Option<&Position> {
        self.positions.get(instrument)
    }

    /// All positions, flat ones included, ordered by instrument
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Mark-to-market exposure for a scope
    pub fn exposure(&self, scope: &ExposureScope) -> Decimal {
        match scope {
            ExposureScope::Instrument(key) => self
                .positions
                .get(key)
                .map(Position::exposure)
                .unwrap_or_default(),
            ExposureScope::Total => self.positions.values().map(Position::exposure).sum(),
        }
    }

    /// All exposure figures needed to check an order on `instrument`
    pub fn exposure_snapshot(&self, instrument: &InstrumentKey) -> ExposureSnapshot {
        let mut snapshot = ExposureSnapshot {
            instrument: self.exposure(&ExposureScope::Instrument(instrument.clone())),
            ..Default::default()
        };
        for position in self.positions.values() {
            snapshot.total += position.exposure();
            if position.instrument.product.is_derivative() {
                snapshot.fno_gross += position.exposure();
                snapshot.fno_net += position.signed_value();
            }
        }
        snapshot
    }

    /// Realized, unrealized and daily P&L
    pub fn pnl(&self) -> PnlSummary {
        let realized: Decimal = self.positions.values().map(|p| p.realized_pnl).sum();
        let unrealized: Decimal = self.positions.values().map(Position::unrealized_pnl).sum();
        let total = realized + unrealized;
        let daily = if self.trading_day.is_some() {
            total - self.day_baseline
        } else {
            total
        };
        PnlSummary {
            realized,
            unrealized,
            total,
            daily,
        }
    }

    /// Start a new trading day if `day` is later than the current one.
    ///
    /// The baseline is the total P&L at the moment the day is first seen.
    /// Earlier days (late fills) never move the baseline.
    pub fn roll_day(&mut self, day: NaiveDate) -> bool {
        if self.trading_day.is_some_and(|current| day <= current) {
            return false;
        }
        self.start_trading_day(day);
        true
    }

    /// Record the current total P&L as `day`'s baseline, even when `day` is
    /// already the current day
    pub fn start_trading_day(&mut self, day: NaiveDate) {
        let baseline = self.pnl().total;
        tracing::info!(
            account = %self.account_id,
            %day,
            baseline = %baseline,
            "Starting trading day"
        );
        self.trading_day = Some(day);
        self.day_baseline = baseline;
    }

    /// Number of distinct fills applied
    pub fn fill_count(&self) -> usize {
        self.applied_fills.len()
    }

    /// Serializable copy of the book
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut applied_fills: Vec<String> = self.applied_fills.iter().cloned().collect();
        applied_fills.sort();
        LedgerSnapshot {
            positions: self.positions.values().cloned().collect(),
            applied_fills,
            trading_day: self.trading_day,
            day_baseline: self.day_baseline,
        }
    }
}

/// Incremental average-price bookkeeping; returns the realized P&L delta
fn apply_to_position(position: &mut Position, fill: &Fill) -> Decimal {
    let old_qty = position.quantity;
    let signed = fill.signed_quantity();
    let mut realized = Decimal::ZERO;

    let same_direction = old_qty.is_zero() || (old_qty > Decimal::ZERO) == (signed > Decimal::ZERO);
    if same_direction {
        let held = old_qty.abs();
        let total = held + fill.quantity;
        position.average_price = (held * position.average_price + fill.quantity * fill.price) / total;
        position.quantity = old_qty + signed;
    } else {
        let held = old_qty.abs();
        let closed = held.min(fill.quantity);
        let direction = if old_qty > Decimal::ZERO {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        realized = closed * (fill.price - position.average_price) * direction;
        position.realized_pnl += realized;

        let residual = fill.quantity - closed;
        if residual > Decimal::ZERO {
            // Reversal: excess opens a fresh position at the fill price
            position.quantity = residual * fill.side.sign();
            position.average_price = fill.price;
        } else {
            position.quantity = old_qty + signed;
            if position.quantity.is_zero() {
                position.average_price = Decimal::ZERO;
            }
        }
    }

    position.last_price = fill.price;
    position.updated_at = fill.timestamp;
    realized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{Product, Side};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn key() -> InstrumentKey {
        InstrumentKey::new("RELIANCE", "NSE", Product::Delivery)
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).unwrap()
    }

    fn create_test_fill(id: &str, side: Side, quantity: Decimal, price: Decimal) -> Fill {
        Fill {
            fill_id: id.to_string(),
            account_id: "ACC1".to_string(),
            instrument: key(),
            side,
            quantity,
            price,
            timestamp: base_time(),
        }
    }

    #[test]
    fn test_scenario_partial_close_and_reversal() {
        let mut book = AccountBook::new("ACC1");

        let p = book
            .apply_fill(&create_test_fill("F1", Side::Buy, dec!(100), dec!(100)))
            .unwrap()
            .position;
        assert_eq!((p.quantity, p.average_price, p.realized_pnl), (dec!(100), dec!(100), dec!(0)));

        let p = book
            .apply_fill(&create_test_fill("F2", Side::Buy, dec!(50), dec!(106)))
            .unwrap()
            .position;
        assert_eq!((p.quantity, p.average_price, p.realized_pnl), (dec!(150), dec!(102), dec!(0)));

        let r = book
            .apply_fill(&create_test_fill("F3", Side::Sell, dec!(80), dec!(110)))
            .unwrap();
        assert_eq!(r.realized, dec!(640));
        let p = r.position;
        assert_eq!((p.quantity, p.average_price, p.realized_pnl), (dec!(70), dec!(102), dec!(640)));

        let r = book
            .apply_fill(&create_test_fill("F4", Side::Sell, dec!(100), dec!(90)))
            .unwrap();
        assert_eq!(r.realized, dec!(-840));
        let p = r.position;
        assert_eq!((p.quantity, p.average_price, p.realized_pnl), (dec!(-30), dec!(90), dec!(-200)));
    }

    #[test]
    fn test_duplicate_fill_is_noop() {
        let mut book = AccountBook::new("ACC1");
        let fill = create_test_fill("F1", Side::Buy, dec!(10), dec!(250));

        let first = book.apply_fill(&fill).unwrap();
        assert!(!first.duplicate);
        let second = book.apply_fill(&fill).unwrap();
        assert!(second.duplicate);
        assert_eq!(second.realized, dec!(0));
        assert_eq!(first.position, second.position);
        assert_eq!(book.fill_count(), 1);
    }

    #[test]
    fn test_average_price_is_weighted_mean() {
        let mut book = AccountBook::new("ACC1");
        let fills = [
            (dec!(7), dec!(101.37)),
            (dec!(13), dec!(99.91)),
            (dec!(3), dec!(104.05)),
            (dec!(11), dec!(100.33)),
        ];
        let mut notional = dec!(0);
        let mut qty = dec!(0);
        for (i, (q, px)) in fills.iter().enumerate() {
            book.apply_fill(&create_test_fill(&format!("F{i}"), Side::Sell, *q, *px))
                .unwrap();
            notional += q * px;
            qty += q;
        }
        let p = book.position(&key()).unwrap();
        assert_eq!(p.quantity, -qty);
        let expected = notional / qty;
        assert!((p.average_price - expected).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_short_cover_realizes_pnl() {
        let mut book = AccountBook::new("ACC1");
        book.apply_fill(&create_test_fill("F1", Side::Sell, dec!(20), dec!(50)))
            .unwrap();
        let r = book
            .apply_fill(&create_test_fill("F2", Side::Buy, dec!(5), dec!(45)))
            .unwrap();
        // Short from 50, covered at 45: +5 per unit
        assert_eq!(r.realized, dec!(25));
        assert_eq!(r.position.quantity, dec!(-15));
        assert_eq!(r.position.average_price, dec!(50));
    }

    #[test]
    fn test_flatten_keeps_realized() {
        let mut book = AccountBook::new("ACC1");
        book.apply_fill(&create_test_fill("F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        let r = book
            .apply_fill(&create_test_fill("F2", Side::Sell, dec!(10), dec!(120)))
            .unwrap();
        assert!(r.position.is_flat());
        assert_eq!(r.position.average_price, dec!(0));
        assert_eq!(r.position.realized_pnl, dec!(200));
        assert_eq!(r.position.exposure(), dec!(0));

        // Re-opening starts a fresh average but keeps cumulative realized
        let r = book
            .apply_fill(&create_test_fill("F3", Side::Buy, dec!(4), dec!(130)))
            .unwrap();
        assert_eq!(r.position.average_price, dec!(130));
        assert_eq!(r.position.realized_pnl, dec!(200));
    }

    #[test]
    fn test_invalid_fill_rejected() {
        let mut book = AccountBook::new("ACC1");
        let zero_qty = create_test_fill("F1", Side::Buy, dec!(0), dec!(100));
        assert!(matches!(
            book.apply_fill(&zero_qty),
            Err(LedgerError::InvalidFill { .. })
        ));
        let bad_price = create_test_fill("F2", Side::Buy, dec!(1), dec!(-3));
        assert!(book.apply_fill(&bad_price).is_err());
        assert_eq!(book.fill_count(), 0);
        assert!(book.position(&key()).is_none());
    }

    #[test]
    fn test_account_mismatch_rejected() {
        let mut book = AccountBook::new("ACC2");
        let fill = create_test_fill("F1", Side::Buy, dec!(1), dec!(100));
        assert!(matches!(
            book.apply_fill(&fill),
            Err(LedgerError::AccountMismatch { .. })
        ));
    }

    #[test]
    fn test_mark_drives_exposure_and_unrealized() {
        let mut book = AccountBook::new("ACC1");
        book.apply_fill(&create_test_fill("F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        book.update_mark(&key(), dec!(110), base_time() + Duration::seconds(5));

        assert_eq!(book.exposure(&ExposureScope::Total), dec!(1100));
        assert_eq!(book.exposure(&ExposureScope::Instrument(key())), dec!(1100));
        let pnl = book.pnl();
        assert_eq!(pnl.unrealized, dec!(100));
        assert_eq!(pnl.total, dec!(100));
    }

    #[test]
    fn test_update_mark_unknown_instrument() {
        let mut book = AccountBook::new("ACC1");
        assert!(book.update_mark(&key(), dec!(10), base_time()).is_none());
        assert!(book.last_price(&key()).is_none());
    }

    #[test]
    fn test_exposure_snapshot_splits_fno() {
        let mut book = AccountBook::new("ACC1");
        book.apply_fill(&create_test_fill("F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        let fut = InstrumentKey::new("NIFTY26MARFUT", "NFO", Product::Futures);
        let mut short_fut = create_test_fill("F2", Side::Sell, dec!(2), dec!(1000));
        short_fut.instrument = fut.clone();
        book.apply_fill(&short_fut).unwrap();

        let snapshot = book.exposure_snapshot(&fut);
        assert_eq!(snapshot.instrument, dec!(2000));
        assert_eq!(snapshot.total, dec!(3000));
        assert_eq!(snapshot.fno_gross, dec!(2000));
        assert_eq!(snapshot.fno_net, dec!(-2000));
    }

    #[test]
    fn test_daily_pnl_rolls_baseline() {
        let mut book = AccountBook::new("ACC1");
        book.apply_fill(&create_test_fill("F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        book.apply_fill(&create_test_fill("F2", Side::Sell, dec!(10), dec!(90)))
            .unwrap();
        assert_eq!(book.pnl().daily, dec!(-100));

        let next_day = base_time().date_naive().succ_opt().unwrap();
        assert!(book.roll_day(next_day));
        assert!(!book.roll_day(next_day));
        let pnl = book.pnl();
        assert_eq!(pnl.total, dec!(-100));
        assert_eq!(pnl.daily, dec!(0));
    }

    #[test]
    fn test_late_fill_keeps_current_baseline() {
        let mut book = AccountBook::new("ACC1");
        let mut open = create_test_fill("F1", Side::Buy, dec!(1000), dec!(1000));
        open.timestamp = base_time() + Duration::days(1);
        book.apply_fill(&open).unwrap();
        book.update_mark(&key(), dec!(985), open.timestamp);
        assert_eq!(book.pnl().daily, dec!(-15000));

        // Stamped the previous day, delivered after today's loss
        let mut late = create_test_fill("F0", Side::Buy, dec!(1), dec!(100));
        late.instrument = InstrumentKey::new("TCS", "NSE", Product::Delivery);
        book.apply_fill(&late).unwrap();

        assert!(!book.roll_day(base_time().date_naive()));
        assert!(!book.roll_day(open.timestamp.date_naive()));
        assert_eq!(book.pnl().daily, dec!(-15000));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut book = AccountBook::new("ACC1");
        book.apply_fill(&create_test_fill("F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        let snapshot = book.snapshot();

        let mut restored = AccountBook::from_snapshot("ACC1", snapshot.clone());
        assert_eq!(restored.snapshot(), snapshot);
        // Restored fill ids still deduplicate
        let again = restored
            .apply_fill(&create_test_fill("F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        assert!(again.duplicate);
    }
}
