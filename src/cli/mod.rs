//! CLI interface for pretrade-risk
//!
//! Provides subcommands for:
//! - `replay`: Feed a JSON-lines event file through a risk controller
//! - `market`: Show market status for a segment
//! - `limits`: Show resolved limits for an account profile
//! - `config`: Show the effective configuration

mod limits;
mod market;
mod replay;

pub use limits::LimitsArgs;
pub use market::MarketArgs;
pub use replay::{ReplayArgs, ReplayEvent, ReplayOutput};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pretrade-risk")]
#[command(about = "Pre-trade risk gate and position ledger for multi-account order flow")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay profile, mark, fill, order and monitor events
    Replay(ReplayArgs),
    /// Show market status for a segment
    Market(MarketArgs),
    /// Show resolved limits for an account profile
    Limits(LimitsArgs),
    /// Show configuration
    Config,
}
