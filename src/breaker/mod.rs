//! Circuit breaker module
//!
//! Tiered per-account trading suspension driven by daily loss ratio

mod circuit_breaker;
mod types;

pub use circuit_breaker::CircuitBreaker;
pub use types::{BreakerLevel, BreakerState, BreakerStatus};
