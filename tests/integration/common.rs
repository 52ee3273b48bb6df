//! Shared fixtures

use chrono::{DateTime, TimeZone, Utc};
use pretrade_risk::alerts::RecordingSink;
use pretrade_risk::config::Config;
use pretrade_risk::controller::RiskController;
use pretrade_risk::execution::{Fill, InstrumentKey, Order, OrderType, Product, Segment, Side};
use pretrade_risk::limits::{AccountProfile, Classification, RiskTier, StaticProfileSource};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Wednesday 10:00 IST
pub fn market_open() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 4, 4, 30, 0).unwrap()
}

pub fn reliance() -> InstrumentKey {
    InstrumentKey::new("RELIANCE", "NSE", Product::Delivery)
}

pub fn nifty_future() -> InstrumentKey {
    InstrumentKey::new("NIFTY26MARFUT", "NFO", Product::Futures)
}

pub fn profile(classification: Classification, tier: RiskTier) -> AccountProfile {
    AccountProfile {
        classification,
        risk_tier: Some(tier),
        net_worth: None,
    }
}

pub fn setup(config: &Config) -> (RiskController, Arc<StaticProfileSource>, Arc<RecordingSink>) {
    let profiles = Arc::new(StaticProfileSource::new());
    let sink = Arc::new(RecordingSink::new());
    let controller = RiskController::new(config, profiles.clone(), sink.clone()).unwrap();
    (controller, profiles, sink)
}

pub fn fill(
    account: &str,
    id: &str,
    instrument: InstrumentKey,
    side: Side,
    quantity: Decimal,
    price: Decimal,
) -> Fill {
    Fill {
        fill_id: id.to_string(),
        account_id: account.to_string(),
        instrument,
        side,
        quantity,
        price,
        timestamp: market_open(),
    }
}

pub fn limit_order(
    account: &str,
    instrument: InstrumentKey,
    side: Side,
    quantity: Decimal,
    price: Decimal,
) -> Order {
    let segment = if instrument.product.is_derivative() {
        Segment::Fno
    } else {
        Segment::Equity
    };
    Order {
        client_order_id: None,
        account_id: account.to_string(),
        instrument,
        side,
        quantity,
        price,
        order_type: OrderType::Limit,
        segment,
    }
}
