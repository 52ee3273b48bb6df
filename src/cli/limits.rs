//! Limits command implementation

use crate::config::Config;
use crate::limits::{AccountProfile, Classification, LimitCatalog, RiskTier};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct LimitsArgs {
    /// Classification: INDIVIDUAL or HNI
    #[arg(long)]
    pub classification: Classification,

    /// Risk tier: LOW, MODERATE, HIGH or VERY_HIGH
    #[arg(long)]
    pub risk_tier: RiskTier,

    /// Declared net worth
    #[arg(long)]
    pub net_worth: Option<Decimal>,
}

impl LimitsArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let catalog = LimitCatalog::new(config.limits.clone());
        let limits = catalog.resolve(&AccountProfile {
            classification: self.classification,
            risk_tier: Some(self.risk_tier),
            net_worth: self.net_worth,
        });
        println!("{}", serde_json::to_string_pretty(&limits)?);
        Ok(())
    }
}
