//! Multi-account position ledger

use super::book::AccountBook;
use super::types::{ExposureScope, FillResult, LedgerError, LedgerSnapshot, PnlSummary, Position};
use crate::execution::{AccountId, Fill, InstrumentKey};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Shared handle to one account's book
pub type BookHandle = Arc<Mutex<AccountBook>>;

/// Tracks positions for all accounts.
///
/// Books are sharded by account id; each book sits behind its own mutex so
/// accounts never contend with each other.
#[derive(Default)]
pub struct PositionLedger {
    accounts: DashMap<AccountId, BookHandle>,
}

impl PositionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to an account's book, creating an empty one if needed
    pub fn account(&self, account_id: &str) -> BookHandle {
        if let Some(handle) = self.accounts.get(account_id) {
            return handle.value().clone();
        }
        self.accounts
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(AccountBook::new(account_id))))
            .value()
            .clone()
    }

    /// Handle to an account's book if it is already loaded
    pub fn existing(&self, account_id: &str) -> Option<BookHandle> {
        self.accounts.get(account_id).map(|h| h.value().clone())
    }

    /// Install a book unless one is already present; returns the live handle.
    ///
    /// `on_install` runs only when `book` is the one installed, while the
    /// entry is still held, so no other caller can observe the book first.
    pub fn insert_if_absent(&self, book: AccountBook, on_install: impl FnOnce()) -> BookHandle {
        match self.accounts.entry(book.account_id().to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                on_install();
                entry.insert(Arc::new(Mutex::new(book))).value().clone()
            }
        }
    }

    /// Restore an account from a snapshot, replacing any loaded book
    pub fn restore(&self, account_id: &str, snapshot: LedgerSnapshot) {
        let book = AccountBook::from_snapshot(account_id, snapshot);
        self.accounts
            .insert(account_id.to_string(), Arc::new(Mutex::new(book)));
    }

    /// Reset an account's daily P&L baseline to its current total P&L
    pub fn start_trading_day(&self, account_id: &str, day: NaiveDate) {
        self.account(account_id).lock().start_trading_day(day);
    }

    /// Apply a fill to its account's book
    pub fn apply_fill(&self, fill: &Fill) -> Result<FillResult, LedgerError> {
        let handle = self.account(&fill.account_id);
        let mut book = handle.lock();
        book.apply_fill(fill)
    }

    /// Update the last price of one account's position
    pub fn update_mark(
        &self,
        account_id: &str,
        instrument: &InstrumentKey,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> Option<Position> {
        if price <= Decimal::ZERO {
            tracing::warn!(%instrument, %price, "Ignoring non-positive mark price");
            return None;
        }
        let handle = self.existing(account_id)?;
        let mut book = handle.lock();
        book.update_mark(instrument, price, at)
    }

    /// Update the last price of every account holding `instrument`.
    ///
    /// Returns the number of positions marked.
    pub fn update_mark_all(&self, instrument: &InstrumentKey, price: Decimal, at: DateTime<Utc>) -> usize {
        if price <= Decimal::ZERO {
            tracing::warn!(%instrument, %price, "Ignoring non-positive mark price");
            return 0;
        }
        // Collect handles first so no shard guard is held while locking books
        let handles: Vec<BookHandle> = self.accounts.iter().map(|e| e.value().clone()).collect();
        handles
            .iter()
            .filter(|handle| handle.lock().update_mark(instrument, price, at).is_some())
            .count()
    }

    /// Mark-to-market exposure for an account
    pub fn exposure(&self, account_id: &str, scope: &ExposureScope) -> Decimal {
        self.existing(account_id)
            .map(|handle| handle.lock().exposure(scope))
            .unwrap_or_default()
    }

    /// Current position for an instrument
    pub fn position(&self, account_id: &str, instrument: &InstrumentKey) -> Option<Position> {
        let handle = self.existing(account_id)?;
        let book = handle.lock();
        book.position(instrument).cloned()
    }

    /// All positions of an account
    pub fn positions(&self, account_id: &str) -> Vec<Position> {
        self.existing(account_id)
            .map(|handle| handle.lock().positions().cloned().collect())
            .unwrap_or_default()
    }

    /// P&L summary of an account
    pub fn pnl(&self, account_id: &str) -> PnlSummary {
        self.existing(account_id)
            .map(|handle| handle.lock().pnl())
            .unwrap_or_default()
    }

    /// Snapshot of an account's book
    pub fn snapshot(&self, account_id: &str) -> Option<LedgerSnapshot> {
        self.existing(account_id).map(|handle| handle.lock().snapshot())
    }

    /// Ids of all loaded accounts
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.accounts.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{Product, Side};
    use rust_decimal_macros::dec;
    use std::thread;

    fn create_test_fill(account: &str, id: &str, side: Side, quantity: Decimal, price: Decimal) -> Fill {
        Fill {
            fill_id: id.to_string(),
            account_id: account.to_string(),
            instrument: InstrumentKey::new("TCS", "NSE", Product::Delivery),
            side,
            quantity,
            price,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_ledger_isolates_accounts() {
        let ledger = PositionLedger::new();
        ledger
            .apply_fill(&create_test_fill("A", "F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        ledger
            .apply_fill(&create_test_fill("B", "F1", Side::Sell, dec!(5), dec!(100)))
            .unwrap();

        let key = InstrumentKey::new("TCS", "NSE", Product::Delivery);
        assert_eq!(ledger.position("A", &key).unwrap().quantity, dec!(10));
        assert_eq!(ledger.position("B", &key).unwrap().quantity, dec!(-5));
        assert_eq!(ledger.accounts(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_update_mark_all() {
        let ledger = PositionLedger::new();
        ledger
            .apply_fill(&create_test_fill("A", "F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        ledger
            .apply_fill(&create_test_fill("B", "F2", Side::Buy, dec!(2), dec!(100)))
            .unwrap();

        let key = InstrumentKey::new("TCS", "NSE", Product::Delivery);
        assert_eq!(ledger.update_mark_all(&key, dec!(120), Utc::now()), 2);
        assert_eq!(ledger.exposure("A", &ExposureScope::Total), dec!(1200));
        assert_eq!(ledger.exposure("B", &ExposureScope::Instrument(key.clone())), dec!(240));
        assert_eq!(ledger.update_mark_all(&key, dec!(0), Utc::now()), 0);
    }

    #[test]
    fn test_unknown_account_reads_are_empty() {
        let ledger = PositionLedger::new();
        assert_eq!(ledger.exposure("nobody", &ExposureScope::Total), dec!(0));
        assert!(ledger.positions("nobody").is_empty());
        assert_eq!(ledger.pnl("nobody"), PnlSummary::default());
        assert!(ledger.snapshot("nobody").is_none());
    }

    #[test]
    fn test_concurrent_fills_same_account() {
        let ledger = Arc::new(PositionLedger::new());
        let workers: Vec<_> = (0..8)
            .map(|w| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("W{w}-{i}");
                        ledger
                            .apply_fill(&create_test_fill("A", &id, Side::Buy, dec!(1), dec!(100)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let key = InstrumentKey::new("TCS", "NSE", Product::Delivery);
        let position = ledger.position("A", &key).unwrap();
        assert_eq!(position.quantity, dec!(400));
        assert_eq!(position.average_price, dec!(100));
    }

    #[test]
    fn test_start_trading_day_resets_baseline() {
        let ledger = PositionLedger::new();
        ledger
            .apply_fill(&create_test_fill("A", "F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        let key = InstrumentKey::new("TCS", "NSE", Product::Delivery);
        ledger.update_mark("A", &key, dec!(95), Utc::now());
        assert_eq!(ledger.pnl("A").daily, dec!(-50));

        ledger.start_trading_day("A", Utc::now().date_naive());
        let pnl = ledger.pnl("A");
        assert_eq!(pnl.total, dec!(-50));
        assert_eq!(pnl.daily, dec!(0));
    }

    #[test]
    fn test_insert_if_absent_runs_hook_once() {
        let ledger = PositionLedger::new();
        let mut installs = 0;
        let first = ledger.insert_if_absent(AccountBook::new("A"), || installs += 1);
        first
            .lock()
            .apply_fill(&create_test_fill("A", "F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();

        let second = ledger.insert_if_absent(AccountBook::new("A"), || installs += 1);
        assert_eq!(installs, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().fill_count(), 1);
    }

    #[test]
    fn test_restore_replaces_book() {
        let ledger = PositionLedger::new();
        ledger
            .apply_fill(&create_test_fill("A", "F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        let snapshot = ledger.snapshot("A").unwrap();

        let other = PositionLedger::new();
        other.restore("A", snapshot);
        let again = other
            .apply_fill(&create_test_fill("A", "F1", Side::Buy, dec!(10), dec!(100)))
            .unwrap();
        assert!(again.duplicate);
        assert_eq!(again.position.quantity, dec!(10));
    }
}
