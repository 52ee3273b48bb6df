//! pretrade-risk: pre-trade risk gate and position ledger for multi-account
//! order flow
//!
//! This library provides the core components for:
//! - Idempotent position ledger with weighted-average cost and daily P&L
//! - Account limit catalog by classification and risk tier
//! - Projected exposure checks against per-account caps
//! - Tiered loss circuit breaker with cool-off
//! - Exchange session calendar per segment
//! - Order validation pipeline and portfolio health monitoring
//! - Alert sinks and account state persistence
//! - Full observability stack

pub mod alerts;
pub mod breaker;
pub mod cli;
pub mod config;
pub mod controller;
pub mod execution;
pub mod ledger;
pub mod limits;
pub mod market;
pub mod store;
pub mod telemetry;
