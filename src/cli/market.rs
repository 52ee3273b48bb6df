//! Market command implementation

use crate::config::Config;
use crate::execution::Segment;
use crate::market::MarketCalendar;
use chrono::{DateTime, Utc};
use clap::Args;

#[derive(Args, Debug)]
pub struct MarketArgs {
    /// Segment: EQUITY, FNO or COMMODITY
    #[arg(long)]
    pub segment: Segment,

    /// Instant to evaluate (RFC 3339), defaults to now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

impl MarketArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let calendar = MarketCalendar::from_config(&config.market)?;
        let at = self.at.unwrap_or_else(Utc::now);
        let status = calendar.is_open(self.segment, at);
        tracing::debug!(segment = %self.segment, %at, open = status.open, "Market status");
        println!("{}", serde_json::to_string_pretty(&status)?);
        Ok(())
    }
}
