//! Concurrency tests

use crate::common::*;
use pretrade_risk::config::Config;
use pretrade_risk::execution::Side;
use pretrade_risk::limits::{Classification, RiskTier};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::thread;

#[test]
fn test_concurrent_fills_and_validations() {
    let (controller, profiles, _sink) = setup(&Config::default());
    for account in ["ACC1", "ACC2"] {
        profiles.insert(account, profile(Classification::Hni, RiskTier::High));
    }

    thread::scope(|s| {
        for t in 0..8 {
            let controller = &controller;
            s.spawn(move || {
                let account = if t % 2 == 0 { "ACC1" } else { "ACC2" };
                for i in 0..100 {
                    let id = format!("T{t}-{i}");
                    let f = fill(account, &id, reliance(), Side::Buy, dec!(1), dec!(100));
                    controller.apply_fill(&f).unwrap();
                    // Redelivery from another consumer
                    assert!(controller.apply_fill(&f).unwrap().duplicate);

                    let order = limit_order(account, reliance(), Side::Buy, dec!(1), dec!(100));
                    assert!(controller.validate_order_at(&order, market_open()).allowed);
                }
            });
        }
    });

    for account in ["ACC1", "ACC2"] {
        let position = controller.ledger().position(account, &reliance()).unwrap();
        assert_eq!(position.quantity, dec!(400));
        assert_eq!(position.average_price, dec!(100));
        assert_eq!(position.realized_pnl, Decimal::ZERO);
    }
}
