//! Position ledger module
//!
//! Fill-driven positions per (account, instrument) with average price,
//! realized/unrealized P&L and mark-to-market exposure

mod book;
mod positions;
mod types;

pub use book::AccountBook;
pub use positions::{BookHandle, PositionLedger};
pub use types::{
    ExposureScope, ExposureSnapshot, FillResult, LedgerError, LedgerSnapshot, PnlSummary, Position,
};
