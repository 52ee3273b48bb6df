//! Replay command implementation
//!
//! Reads one JSON event per line and prints one JSON result per line.
//! Alerts raised along the way are written to stderr.

use crate::alerts::{Alert, ChannelSink};
use crate::config::Config;
use crate::controller::{PortfolioHealth, RiskController, ValidationResult};
use crate::execution::{AccountId, Fill, InstrumentKey, Order};
use crate::ledger::FillResult;
use crate::limits::{AccountProfile, StaticProfileSource};
use crate::store::JsonFileStore;
use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

const ALERT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines event file
    pub events: PathBuf,

    /// Directory for persisted account state
    #[arg(long)]
    pub store: Option<PathBuf>,
}

/// One input line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplayEvent {
    /// Register or replace an account profile
    Profile {
        account_id: AccountId,
        profile: AccountProfile,
    },
    /// Last price for an instrument, for one account or all holders
    Mark {
        #[serde(default)]
        account_id: Option<AccountId>,
        instrument: InstrumentKey,
        price: Decimal,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    /// Executed fill
    Fill { fill: Fill },
    /// Order to validate
    Order {
        order: Order,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    /// Portfolio health check
    Monitor {
        account_id: AccountId,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
}

/// One output line
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplayOutput {
    Profile { account_id: AccountId },
    Mark { updated: usize },
    Fill { result: FillResult },
    Order { result: ValidationResult },
    Monitor { health: PortfolioHealth },
    Error { line: usize, message: String },
}

impl ReplayArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let file = std::fs::File::open(&self.events)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", self.events.display(), e))?;

        let profiles = Arc::new(StaticProfileSource::new());
        let (sink, mut rx) = ChannelSink::new(ALERT_CHANNEL_CAPACITY);
        let mut controller = RiskController::new(config, profiles.clone(), Arc::new(sink))?;
        if let Some(dir) = &self.store {
            controller = controller.with_store(Arc::new(JsonFileStore::open(dir)?));
        }

        let drain = tokio::spawn(async move {
            let mut count = 0usize;
            while let Some(alert) = rx.recv().await {
                count += 1;
                print_alert(&alert);
            }
            count
        });

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let mut events = 0usize;
        let mut errors = 0usize;

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events += 1;
            let output = match serde_json::from_str::<ReplayEvent>(&line) {
                Ok(event) => handle_event(&controller, &profiles, event),
                Err(e) => Err(format!("invalid event: {e}")),
            }
            .unwrap_or_else(|message| {
                errors += 1;
                tracing::warn!(line = index + 1, %message, "Replay event failed");
                ReplayOutput::Error {
                    line: index + 1,
                    message,
                }
            });
            writeln!(out, "{}", serde_json::to_string(&output)?)?;
            // Let the drain task keep up with a long file
            tokio::task::yield_now().await;
        }
        out.flush()?;
        drop(out);

        // Dropping the controller closes the alert channel
        drop(controller);
        let alerts = drain.await?;
        tracing::info!(events, errors, alerts, "Replay complete");
        Ok(())
    }
}

fn handle_event(
    controller: &RiskController,
    profiles: &StaticProfileSource,
    event: ReplayEvent,
) -> Result<ReplayOutput, String> {
    match event {
        ReplayEvent::Profile {
            account_id,
            profile,
        } => {
            profiles.insert(account_id.clone(), profile);
            controller.invalidate_profile(&account_id);
            Ok(ReplayOutput::Profile { account_id })
        }
        ReplayEvent::Mark {
            account_id,
            instrument,
            price,
            at,
        } => {
            let at = at.unwrap_or_else(Utc::now);
            let updated = match account_id {
                Some(account_id) => controller
                    .update_mark(&account_id, &instrument, price, at)
                    .map_err(|e| e.to_string())?
                    .map_or(0, |_| 1),
                None => controller.update_mark_all(&instrument, price, at),
            };
            Ok(ReplayOutput::Mark { updated })
        }
        ReplayEvent::Fill { fill } => controller
            .apply_fill(&fill)
            .map(|result| ReplayOutput::Fill { result })
            .map_err(|e| e.to_string()),
        ReplayEvent::Order { order, at } => {
            let result = controller.validate_order_at(&order, at.unwrap_or_else(Utc::now));
            Ok(ReplayOutput::Order { result })
        }
        ReplayEvent::Monitor { account_id, at } => controller
            .monitor_portfolio(&account_id, at.unwrap_or_else(Utc::now))
            .map(|health| ReplayOutput::Monitor { health })
            .map_err(|e| e.to_string()),
    }
}

fn print_alert(alert: &Alert) {
    match serde_json::to_string(alert) {
        Ok(json) => eprintln!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize alert"),
    }
}
