//! Persistence tests

use crate::common::*;
use chrono::Duration;
use pretrade_risk::breaker::BreakerLevel;
use pretrade_risk::config::Config;
use pretrade_risk::controller::DenyReason;
use pretrade_risk::execution::Side;
use pretrade_risk::limits::{Classification, RiskTier};
use pretrade_risk::store::{JsonFileStore, StateStore};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[test]
fn test_restart_restores_positions_and_breaker() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();

    {
        let (controller, profiles, _sink) = setup(&config);
        let controller = controller.with_store(Arc::new(JsonFileStore::open(dir.path()).unwrap()));
        profiles.insert("ACC1", profile(Classification::Individual, RiskTier::High));

        controller
            .apply_fill(&fill("ACC1", "F1", reliance(), Side::Buy, dec!(100), dec!(1000)))
            .unwrap();
        controller
            .update_mark("ACC1", &reliance(), dec!(750), market_open())
            .unwrap();
        let health = controller.monitor_portfolio("ACC1", market_open()).unwrap();
        assert_eq!(health.breaker.map(|b| b.level), Some(BreakerLevel::Level3));
    }

    let store = JsonFileStore::open(dir.path()).unwrap();
    let saved = store.load("ACC1").unwrap().unwrap();
    assert_eq!(saved.ledger.applied_fills, vec!["F1".to_string()]);
    assert_eq!(saved.breaker.as_ref().map(|b| b.level), Some(BreakerLevel::Level3));

    let (controller, profiles, _sink) = setup(&config);
    let controller = controller.with_store(Arc::new(store));
    profiles.insert("ACC1", profile(Classification::Individual, RiskTier::High));

    // The breaker survives the restart
    let order = limit_order("ACC1", reliance(), Side::Buy, dec!(1), dec!(750));
    let result = controller.validate_order_at(&order, market_open() + Duration::hours(2));
    assert!(matches!(
        result.primary_reason(),
        Some(DenyReason::CircuitBreaker {
            level: BreakerLevel::Level3,
            ..
        })
    ));

    // So does the position, including its mark and applied fill ids
    let position = controller.ledger().position("ACC1", &reliance()).unwrap();
    assert_eq!(position.quantity, dec!(100));
    assert_eq!(position.last_price, dec!(750));
    let replay = controller
        .apply_fill(&fill("ACC1", "F1", reliance(), Side::Buy, dec!(100), dec!(1000)))
        .unwrap();
    assert!(replay.duplicate);
}

#[test]
fn test_invalid_account_key_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, _profiles, _sink) = setup(&Config::default());
    let controller = controller.with_store(Arc::new(JsonFileStore::open(dir.path()).unwrap()));

    let order = limit_order("../escape", reliance(), Side::Buy, dec!(1), dec!(100));
    let result = controller.validate_order_at(&order, market_open());
    assert!(!result.allowed);
    assert!(matches!(
        result.primary_reason(),
        Some(DenyReason::StateUnavailable { .. })
    ));
}
