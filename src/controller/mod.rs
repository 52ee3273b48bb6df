//! Risk controller
//!
//! Orchestrates the pre-trade pipeline over the ledger, limit catalog,
//! circuit breaker and market calendar, and monitors portfolio health.

mod engine;
mod types;
mod velocity;

pub use engine::RiskController;
pub use types::{
    CheckKind, CheckRecord, ConcentrationWarning, DenyReason, HealthRating, PortfolioHealth,
    RiskError, RiskWarning, ValidationResult,
};
pub use velocity::OrderVelocity;
