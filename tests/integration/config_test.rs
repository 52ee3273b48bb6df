//! Configuration tests

use chrono::{NaiveDate, TimeZone, Utc};
use pretrade_risk::config::Config;
use pretrade_risk::execution::Segment;
use pretrade_risk::market::{ClosedReason, MarketCalendar};
use rust_decimal_macros::dec;

#[test]
fn test_config_example_matches_defaults() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    let defaults = Config::default();

    assert_eq!(config.limits.individual, defaults.limits.individual);
    assert_eq!(config.limits.hni, defaults.limits.hni);
    assert_eq!(config.limits.multipliers, defaults.limits.multipliers);
    assert_eq!(config.breaker.level_1, defaults.breaker.level_1);
    assert_eq!(config.breaker.level_3, defaults.breaker.level_3);
    assert_eq!(config.market.sessions, defaults.market.sessions);
    assert_eq!(config.controller.large_order_threshold, dec!(1000000));
    assert_eq!(config.telemetry.metrics_port, None);
}

#[test]
fn test_config_example_holidays_close_market() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert!(config
        .market
        .holidays
        .contains(&NaiveDate::from_ymd_opt(2026, 1, 26).unwrap()));

    let calendar = MarketCalendar::from_config(&config.market).unwrap();
    // Republic Day, a Monday, 11:00 IST
    let status = calendar.is_open(Segment::Equity, Utc.with_ymd_and_hms(2026, 1, 26, 5, 30, 0).unwrap());
    assert!(!status.open);
    assert_eq!(status.reason, Some(ClosedReason::Holiday));
    // Tuesday 09:00 IST
    assert_eq!(
        status.next_opening,
        Some(Utc.with_ymd_and_hms(2026, 1, 27, 3, 30, 0).unwrap())
    );
}
