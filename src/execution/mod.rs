//! Execution event module
//!
//! Standardized order and fill events consumed by the risk engine

mod types;

pub use types::{AccountId, Fill, InstrumentKey, Order, OrderType, Product, Segment, Side};
