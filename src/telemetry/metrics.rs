//! Prometheus metrics
//!
//! Thin wrappers over the `metrics` facade; without an installed recorder
//! every call is a no-op.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;

/// Final outcome of an order validation
#[derive(Debug, Clone, Copy)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    fn as_str(&self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::Denied => "denied",
        }
    }
}

/// Record one order decision and how long it took
pub fn record_validation(decision: Decision, elapsed: Duration) {
    metrics::counter!("pretrade_orders_total", "outcome" => decision.as_str()).increment(1);
    metrics::histogram!("pretrade_validation_latency_us").record(elapsed.as_secs_f64() * 1e6);
}

/// Record a denial by its reason code
pub fn record_denial(reason: &'static str) {
    metrics::counter!("pretrade_denials_total", "reason" => reason).increment(1);
}

/// Record a processed fill
pub fn record_fill(duplicate: bool) {
    let outcome = if duplicate { "duplicate" } else { "applied" };
    metrics::counter!("pretrade_fills_total", "outcome" => outcome).increment(1);
}

/// Record a breaker trip
pub fn record_breaker_trip(level: &str) {
    metrics::counter!("pretrade_breaker_trips_total", "level" => level.to_string()).increment(1);
}

/// Record an alert delivery attempt
pub fn record_alert(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "dropped" };
    metrics::counter!("pretrade_alerts_total", "outcome" => outcome).increment(1);
}

/// Publish an account's total exposure
pub fn set_exposure(account_id: &str, exposure: Decimal) {
    metrics::gauge!("pretrade_account_exposure", "account" => account_id.to_string())
        .set(exposure.to_f64().unwrap_or_default());
}
