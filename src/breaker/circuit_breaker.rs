//! Loss-ratio circuit breaker
//!
//! ```text
//!   NONE ──loss >= 10%──► LEVEL_1 (15 min)
//!        ──loss >= 15%──► LEVEL_2 (60 min)
//!        ──loss >= 20%──► LEVEL_3 (1440 min)
//!
//!   tripped ──now >= cooloff_until──► NONE (resolved on read)
//! ```
//!
//! The highest threshold met is selected at trip time. A tripped account is
//! never re-levelled until its own cool-off has elapsed.

use super::types::{BreakerLevel, BreakerState, BreakerStatus};
use crate::config::{BreakerConfig, TierConfig};
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;

/// Per-account tiered circuit breaker
pub struct CircuitBreaker {
    config: BreakerConfig,
    states: DashMap<String, BreakerState>,
}

impl CircuitBreaker {
    /// Create a breaker with the given tiers
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    fn tier(&self, level: BreakerLevel) -> &TierConfig {
        match level {
            BreakerLevel::Level1 => &self.config.level_1,
            BreakerLevel::Level2 => &self.config.level_2,
            BreakerLevel::Level3 => &self.config.level_3,
        }
    }

    /// Cool-off duration of a level
    pub fn cooloff(&self, level: BreakerLevel) -> Duration {
        Duration::minutes(self.tier(level).cooloff_minutes)
    }

    /// `current_loss / max_loss_limit`, zero when there is no loss
    pub fn loss_ratio(current_loss: Decimal, max_loss_limit: Decimal) -> Decimal {
        if current_loss <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        if max_loss_limit <= Decimal::ZERO {
            return Decimal::ONE;
        }
        current_loss / max_loss_limit
    }

    /// Highest level whose threshold the loss meets.
    ///
    /// A non-positive limit with any loss selects LEVEL_3.
    pub fn evaluate_loss(&self, current_loss: Decimal, max_loss_limit: Decimal) -> Option<BreakerLevel> {
        if current_loss <= Decimal::ZERO {
            return None;
        }
        if max_loss_limit <= Decimal::ZERO {
            return Some(BreakerLevel::Level3);
        }
        let ratio = current_loss / max_loss_limit;
        [BreakerLevel::Level3, BreakerLevel::Level2, BreakerLevel::Level1]
            .into_iter()
            .find(|level| ratio >= self.tier(*level).loss_ratio)
    }

    /// Trip the breaker if the account has no active state and a threshold is
    /// met. Returns the new state when a trip happened.
    pub fn check_and_trip(
        &self,
        account_id: &str,
        current_loss: Decimal,
        max_loss_limit: Decimal,
        now: DateTime<Utc>,
    ) -> Option<BreakerState> {
        match self.states.entry(account_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().cooloff_until > now {
                    return None;
                }
                let expired = entry.get().level;
                match self.evaluate_loss(current_loss, max_loss_limit) {
                    Some(level) => {
                        let state = self.new_state(account_id, level, current_loss, max_loss_limit, now);
                        tracing::warn!(
                            account = account_id,
                            previous = %expired,
                            %level,
                            "Circuit breaker re-tripped after cool-off"
                        );
                        entry.insert(state.clone());
                        Some(state)
                    }
                    None => {
                        entry.remove();
                        tracing::info!(account = account_id, level = %expired, "Circuit breaker cool-off elapsed");
                        None
                    }
                }
            }
            Entry::Vacant(entry) => {
                let level = self.evaluate_loss(current_loss, max_loss_limit)?;
                let state = self.new_state(account_id, level, current_loss, max_loss_limit, now);
                tracing::error!(
                    account = account_id,
                    %level,
                    loss_ratio = %state.loss_ratio,
                    cooloff_until = %state.cooloff_until,
                    "Circuit breaker tripped"
                );
                entry.insert(state.clone());
                Some(state)
            }
        }
    }

    /// Whether the account may trade at `now`; clears an expired state
    pub fn is_trading_allowed(&self, account_id: &str, now: DateTime<Utc>) -> BreakerStatus {
        // Read first so the common untripped case allocates nothing
        if !self.states.contains_key(account_id) {
            return BreakerStatus::Allowed { cleared: None };
        }
        match self.states.entry(account_id.to_string()) {
            Entry::Occupied(entry) if entry.get().cooloff_until <= now => {
                let state = entry.remove();
                tracing::info!(account = account_id, level = %state.level, "Circuit breaker cool-off elapsed");
                BreakerStatus::Allowed {
                    cleared: Some(state.level),
                }
            }
            Entry::Occupied(entry) => {
                let state = entry.get();
                BreakerStatus::CoolingOff {
                    level: state.level,
                    cooloff_until: state.cooloff_until,
                    remaining_minutes: remaining_minutes(state.cooloff_until, now),
                }
            }
            Entry::Vacant(_) => BreakerStatus::Allowed { cleared: None },
        }
    }

    /// Active state of an account, if any (expired states included until
    /// they are next observed)
    pub fn state(&self, account_id: &str) -> Option<BreakerState> {
        self.states.get(account_id).map(|s| s.value().clone())
    }

    /// Reinstall a persisted state
    pub fn restore(&self, state: BreakerState) {
        self.states.insert(state.account_id.clone(), state);
    }

    /// Manual operator reset
    pub fn reset(&self, account_id: &str) -> Option<BreakerState> {
        let removed = self.states.remove(account_id).map(|(_, s)| s);
        if let Some(state) = &removed {
            tracing::warn!(account = account_id, level = %state.level, "Circuit breaker manually reset");
        }
        removed
    }

    /// Clear every expired state; returns how many were cleared
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| state.cooloff_until > now);
        before - self.states.len()
    }

    /// Number of accounts with a recorded state
    pub fn active_count(&self) -> usize {
        self.states.len()
    }

    fn new_state(
        &self,
        account_id: &str,
        level: BreakerLevel,
        current_loss: Decimal,
        max_loss_limit: Decimal,
        now: DateTime<Utc>,
    ) -> BreakerState {
        BreakerState {
            account_id: account_id.to_string(),
            level,
            loss_ratio: Self::loss_ratio(current_loss, max_loss_limit).round_dp(4),
            tripped_at: now,
            cooloff_until: now + self.cooloff(level),
        }
    }
}

/// Whole minutes left, rounded up
fn remaining_minutes(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds().max(0);
    (millis + 59_999) / 60_000
}
