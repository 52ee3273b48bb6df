//! End-to-end tests through the risk controller

use crate::common::*;
use chrono::Duration;
use pretrade_risk::alerts::AlertKind;
use pretrade_risk::breaker::BreakerLevel;
use pretrade_risk::config::Config;
use pretrade_risk::controller::{DenyReason, HealthRating, RiskWarning};
use pretrade_risk::execution::Side;
use pretrade_risk::limits::{Classification, LimitKind, RiskTier};
use rust_decimal_macros::dec;

#[test]
fn test_position_lifecycle() {
    let (controller, profiles, _sink) = setup(&Config::default());
    profiles.insert("ACC1", profile(Classification::Individual, RiskTier::High));

    let steps = [
        ("F1", Side::Buy, dec!(100), dec!(100), dec!(100), dec!(100), dec!(0)),
        ("F2", Side::Buy, dec!(50), dec!(106), dec!(150), dec!(102), dec!(0)),
        ("F3", Side::Sell, dec!(80), dec!(110), dec!(70), dec!(102), dec!(640)),
        ("F4", Side::Sell, dec!(100), dec!(90), dec!(-30), dec!(90), dec!(-200)),
    ];
    for (id, side, qty, price, exp_qty, exp_avg, exp_realized) in steps {
        let order = limit_order("ACC1", reliance(), side, qty, price);
        assert!(controller.validate_order_at(&order, market_open()).allowed, "{id}");

        let result = controller
            .apply_fill(&fill("ACC1", id, reliance(), side, qty, price))
            .unwrap();
        assert_eq!(result.position.quantity, exp_qty, "{id}");
        assert_eq!(result.position.average_price, exp_avg, "{id}");
        assert_eq!(result.position.realized_pnl, exp_realized, "{id}");
    }

    // Replaying the whole stream changes nothing
    for id in ["F1", "F2", "F3", "F4"] {
        let replay = controller
            .apply_fill(&fill("ACC1", id, reliance(), Side::Buy, dec!(1), dec!(1)))
            .unwrap();
        assert!(replay.duplicate);
    }

    let health = controller.monitor_portfolio("ACC1", market_open()).unwrap();
    assert_eq!(health.pnl.realized, dec!(-200));
    assert_eq!(health.pnl.unrealized, dec!(0));
    assert_eq!(health.pnl.daily, dec!(-200));
    assert_eq!(health.total_exposure, dec!(2700));
    assert_eq!(health.rating, HealthRating::Healthy);
}

#[test]
fn test_fno_net_cap() {
    let (controller, profiles, sink) = setup(&Config::default());
    profiles.insert("ACC1", profile(Classification::Individual, RiskTier::High));
    let banknifty = pretrade_risk::execution::InstrumentKey::new(
        "BANKNIFTY26MARFUT",
        "NFO",
        pretrade_risk::execution::Product::Futures,
    );

    controller
        .apply_fill(&fill("ACC1", "F1", nifty_future(), Side::Buy, dec!(400), dec!(1000)))
        .unwrap();

    // Short hedge nets out, gross climbs near its cap
    let hedge = limit_order("ACC1", banknifty.clone(), Side::Sell, dec!(450), dec!(1000));
    let result = controller.validate_order_at(&hedge, market_open());
    assert!(result.allowed);
    assert!(result.warnings.iter().any(|w| matches!(
        w,
        RiskWarning::LimitApproaching(warning) if warning.kind == LimitKind::FnoGross
    )));

    // Adding to the long side breaches only the net cap
    sink.drain();
    let add = limit_order("ACC1", banknifty, Side::Buy, dec!(150), dec!(1000));
    let result = controller.validate_order_at(&add, market_open());
    assert!(!result.allowed);
    match result.primary_reason() {
        Some(DenyReason::LimitBreached { breaches }) => {
            assert_eq!(breaches.len(), 1);
            assert_eq!(breaches[0].kind, LimitKind::FnoNet);
            assert_eq!(breaches[0].projected, dec!(550000));
        }
        other => panic!("unexpected reason: {other:?}"),
    }
    assert!(sink.alerts().iter().any(|a| a.kind == AlertKind::LimitBreached));
}

#[test]
fn test_realized_loss_trips_breaker_until_cooloff() {
    let (controller, profiles, sink) = setup(&Config::default());
    profiles.insert("ACC1", profile(Classification::Individual, RiskTier::High));

    controller
        .apply_fill(&fill("ACC1", "F1", reliance(), Side::Buy, dec!(1000), dec!(1000)))
        .unwrap();
    controller
        .apply_fill(&fill("ACC1", "F2", reliance(), Side::Sell, dec!(1000), dec!(985)))
        .unwrap();

    // -15,000 against a 100,000 daily cap
    let health = controller.monitor_portfolio("ACC1", market_open()).unwrap();
    assert_eq!(health.rating, HealthRating::Critical);
    let state = health.breaker.unwrap();
    assert_eq!(state.level, BreakerLevel::Level2);
    assert_eq!(state.cooloff_until, market_open() + Duration::minutes(60));
    assert!(sink
        .alerts()
        .iter()
        .any(|a| a.kind == AlertKind::CircuitBreakerTripped));

    // Still inside the cool-off: a second check does not re-trip
    let again = controller
        .monitor_portfolio("ACC1", market_open() + Duration::minutes(30))
        .unwrap();
    assert_eq!(again.breaker.unwrap().tripped_at, market_open());

    let order = limit_order("ACC1", reliance(), Side::Buy, dec!(1), dec!(985));
    let denied = controller.validate_order_at(&order, market_open() + Duration::minutes(59));
    assert!(!denied.allowed);
    assert!(matches!(
        denied.primary_reason(),
        Some(DenyReason::CircuitBreaker {
            level: BreakerLevel::Level2,
            remaining_minutes: 1,
            ..
        })
    ));

    let allowed = controller.validate_order_at(&order, market_open() + Duration::minutes(60));
    assert!(allowed.allowed);
}

#[test]
fn test_weekend_order_denied() {
    let (controller, profiles, _sink) = setup(&Config::default());
    profiles.insert("ACC1", profile(Classification::Individual, RiskTier::High));

    // Saturday 11:00 IST
    let saturday = market_open() + Duration::days(3) + Duration::hours(1);
    let order = limit_order("ACC1", reliance(), Side::Buy, dec!(1), dec!(100));
    let result = controller.validate_order_at(&order, saturday);

    assert!(!result.allowed);
    match result.primary_reason() {
        Some(DenyReason::MarketClosed {
            reason,
            next_opening,
            ..
        }) => {
            assert_eq!(*reason, pretrade_risk::market::ClosedReason::Weekend);
            // Monday 09:00 IST
            assert_eq!(
                *next_opening,
                Some(market_open() + Duration::days(5) - Duration::hours(1))
            );
        }
        other => panic!("unexpected reason: {other:?}"),
    }
}
