//! Market timing module
//!
//! Weekend, holiday and session-window checks per segment

mod calendar;
mod types;

pub use calendar::MarketCalendar;
pub use types::{CalendarError, ClosedReason, MarketStatus};
