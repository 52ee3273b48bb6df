//! Configuration types for pretrade-risk
//!
//! Every section and field has a default, so an empty file yields the
//! standard catalog, breaker tiers and exchange calendar.

use crate::execution::Segment;
use crate::telemetry::LogFormat;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Caps for one account classification, before tier scaling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BaseCaps {
    /// Exposure cap on any single instrument
    pub single_instrument: Decimal,
    /// Exposure cap across all instruments
    pub aggregate: Decimal,
    /// Gross derivative exposure cap
    pub fno_gross: Decimal,
    /// Net derivative exposure cap
    pub fno_net: Decimal,
    /// Daily loss limit used by the circuit breaker
    pub daily_loss: Decimal,
}

/// Per-tier scaling applied to base caps
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RiskMultipliers {
    #[serde(default = "default_low_multiplier")]
    pub low: Decimal,
    #[serde(default = "default_moderate_multiplier")]
    pub moderate: Decimal,
    #[serde(default = "default_high_multiplier")]
    pub high: Decimal,
    #[serde(default = "default_very_high_multiplier")]
    pub very_high: Decimal,
}

fn default_low_multiplier() -> Decimal {
    dec!(0.5)
}
fn default_moderate_multiplier() -> Decimal {
    dec!(0.75)
}
fn default_high_multiplier() -> Decimal {
    dec!(1.0)
}
fn default_very_high_multiplier() -> Decimal {
    dec!(1.25)
}

impl Default for RiskMultipliers {
    fn default() -> Self {
        Self {
            low: default_low_multiplier(),
            moderate: default_moderate_multiplier(),
            high: default_high_multiplier(),
            very_high: default_very_high_multiplier(),
        }
    }
}

/// Limit catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Net worth at or above which an account is treated as HNI
    #[serde(default = "default_hni_threshold")]
    pub hni_net_worth_threshold: Decimal,

    /// Fraction of a cap at which a warning is raised
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: Decimal,

    /// Base caps for individual accounts
    #[serde(default = "default_individual_caps")]
    pub individual: BaseCaps,

    /// Base caps for HNI accounts
    #[serde(default = "default_hni_caps")]
    pub hni: BaseCaps,

    /// Risk tier multipliers
    #[serde(default)]
    pub multipliers: RiskMultipliers,
}

fn default_hni_threshold() -> Decimal {
    dec!(10000000)
}
fn default_warning_ratio() -> Decimal {
    dec!(0.8)
}
fn default_individual_caps() -> BaseCaps {
    BaseCaps {
        single_instrument: dec!(500000),
        aggregate: dec!(2000000),
        fno_gross: dec!(1000000),
        fno_net: dec!(500000),
        daily_loss: dec!(100000),
    }
}
fn default_hni_caps() -> BaseCaps {
    BaseCaps {
        single_instrument: dec!(5000000),
        aggregate: dec!(20000000),
        fno_gross: dec!(10000000),
        fno_net: dec!(5000000),
        daily_loss: dec!(1000000),
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            hni_net_worth_threshold: default_hni_threshold(),
            warning_ratio: default_warning_ratio(),
            individual: default_individual_caps(),
            hni: default_hni_caps(),
            multipliers: RiskMultipliers::default(),
        }
    }
}

/// One circuit breaker tier
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TierConfig {
    /// Loss ratio (loss / daily loss cap) that trips this tier
    pub loss_ratio: Decimal,
    /// Cool-off duration once tripped
    pub cooloff_minutes: i64,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerConfig {
    #[serde(default = "default_level_1")]
    pub level_1: TierConfig,
    #[serde(default = "default_level_2")]
    pub level_2: TierConfig,
    #[serde(default = "default_level_3")]
    pub level_3: TierConfig,
}

fn default_level_1() -> TierConfig {
    TierConfig {
        loss_ratio: dec!(0.10),
        cooloff_minutes: 15,
    }
}
fn default_level_2() -> TierConfig {
    TierConfig {
        loss_ratio: dec!(0.15),
        cooloff_minutes: 60,
    }
}
fn default_level_3() -> TierConfig {
    TierConfig {
        loss_ratio: dec!(0.20),
        cooloff_minutes: 1440,
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            level_1: default_level_1(),
            level_2: default_level_2(),
            level_3: default_level_3(),
        }
    }
}

/// A trading session window in exchange-local time; `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionWindow {
    /// Session name, e.g. `normal`
    pub name: String,
    /// Inclusive start
    pub start: NaiveTime,
    /// Exclusive end
    pub end: NaiveTime,
}

impl SessionWindow {
    /// Create a window from hour/minute pairs
    pub fn new(name: &str, start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            name: name.to_string(),
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or_default(),
        }
    }

    /// Whether `time` falls inside the window
    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time < self.end
    }
}

/// Exchange calendar configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
    /// Exchange offset from UTC in minutes (IST = 330)
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Exchange holidays (always closed)
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    /// Session windows per segment
    #[serde(default = "default_sessions")]
    pub sessions: HashMap<Segment, Vec<SessionWindow>>,
}

fn default_utc_offset_minutes() -> i32 {
    330
}

fn default_sessions() -> HashMap<Segment, Vec<SessionWindow>> {
    HashMap::from([
        (
            Segment::Equity,
            vec![
                SessionWindow::new("pre_open", (9, 0), (9, 8)),
                SessionWindow::new("normal", (9, 15), (15, 30)),
                SessionWindow::new("closing", (15, 40), (16, 0)),
            ],
        ),
        (
            Segment::Fno,
            vec![SessionWindow::new("normal", (9, 15), (15, 30))],
        ),
        (
            Segment::Commodity,
            vec![SessionWindow::new("normal", (9, 0), (23, 30))],
        ),
    ])
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            holidays: vec![],
            sessions: default_sessions(),
        }
    }
}

/// Order pipeline heuristics and portfolio health configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Order value above which a large-order warning is raised
    #[serde(default = "default_large_order_threshold")]
    pub large_order_threshold: Decimal,

    /// Orders inside the window that flag rapid trading
    #[serde(default = "default_rapid_order_count")]
    pub rapid_order_count: usize,

    /// Trailing window for rapid-trading detection (seconds)
    #[serde(default = "default_rapid_window_secs")]
    pub rapid_window_secs: i64,

    /// Largest share of total exposure one instrument may hold before a
    /// diversification warning
    #[serde(default = "default_max_concentration")]
    pub max_concentration: Decimal,

    /// Loss ratio at which portfolio health becomes AT_RISK
    #[serde(default = "default_at_risk_loss_ratio")]
    pub at_risk_loss_ratio: Decimal,
}

fn default_large_order_threshold() -> Decimal {
    dec!(1000000)
}
fn default_rapid_order_count() -> usize {
    10
}
fn default_rapid_window_secs() -> i64 {
    300
}
fn default_max_concentration() -> Decimal {
    dec!(0.30)
}
fn default_at_risk_loss_ratio() -> Decimal {
    dec!(0.05)
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            large_order_threshold: default_large_order_threshold(),
            rapid_order_count: default_rapid_order_count(),
            rapid_window_secs: default_rapid_window_secs(),
            max_concentration: default_max_concentration(),
            at_risk_loss_ratio: default_at_risk_loss_ratio(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Default log filter (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus listener port; no exporter when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
