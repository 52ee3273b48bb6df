//! Limit catalog: account profile -> numeric caps

use super::types::{
    AccountProfile, Classification, LimitCategory, LimitProfile, ProfileError, ProfileSource,
    RiskTier,
};
use crate::config::{BaseCaps, LimitsConfig};
use crate::execution::AccountId;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Resolves and caches per-account limits
pub struct LimitCatalog {
    config: LimitsConfig,
    cache: DashMap<AccountId, LimitProfile>,
}

impl LimitCatalog {
    /// Create a catalog from configuration
    pub fn new(config: LimitsConfig) -> Self {
        Self {
            config,
            cache: DashMap::new(),
        }
    }

    /// Catalog configuration
    pub fn config(&self) -> &LimitsConfig {
        &self.config
    }

    /// Resolve limits from a profile.
    ///
    /// A missing risk tier resolves at the lowest tier and is flagged as a
    /// fallback.
    pub fn resolve(&self, profile: &AccountProfile) -> LimitProfile {
        let is_hni = profile.classification == Classification::Hni
            || profile
                .net_worth
                .is_some_and(|nw| nw >= self.config.hni_net_worth_threshold);
        let category = if is_hni {
            LimitCategory::EquityHni
        } else {
            LimitCategory::EquityIndividual
        };

        match profile.risk_tier {
            Some(tier) => self.scaled(category, tier, false),
            None => {
                tracing::warn!(%category, "Profile has no risk tier; using lowest tier");
                self.scaled(category, RiskTier::Low, true)
            }
        }
    }

    /// The most conservative limits in the catalog
    pub fn conservative(&self) -> LimitProfile {
        self.scaled(LimitCategory::EquityIndividual, RiskTier::Low, true)
    }

    /// Limits for an account, fetched through `source` on a cache miss.
    ///
    /// Missing profiles fall back to [`Self::conservative`] and are not
    /// cached. An unavailable source is returned as an error.
    pub fn limits_for(
        &self,
        account_id: &str,
        source: &dyn ProfileSource,
    ) -> Result<LimitProfile, ProfileError> {
        if let Some(cached) = self.cache.get(account_id) {
            return Ok(cached.value().clone());
        }

        match source.fetch(account_id) {
            Ok(profile) => {
                let limits = self.resolve(&profile);
                if !limits.fallback {
                    self.cache.insert(account_id.to_string(), limits.clone());
                }
                tracing::debug!(
                    account = account_id,
                    category = %limits.category,
                    tier = ?limits.risk_tier,
                    "Resolved account limits"
                );
                Ok(limits)
            }
            Err(ProfileError::NotFound(_)) => {
                tracing::warn!(
                    account = account_id,
                    "No profile found; applying conservative limits"
                );
                Ok(self.conservative())
            }
            Err(e) => Err(e),
        }
    }

    /// Drop a cached profile so the next lookup re-resolves it
    pub fn invalidate(&self, account_id: &str) -> bool {
        self.cache.remove(account_id).is_some()
    }

    /// Cached limits, if any
    pub fn cached(&self, account_id: &str) -> Option<LimitProfile> {
        self.cache.get(account_id).map(|l| l.value().clone())
    }

    fn scaled(&self, category: LimitCategory, tier: RiskTier, fallback: bool) -> LimitProfile {
        let base: &BaseCaps = match category {
            LimitCategory::EquityIndividual => &self.config.individual,
            LimitCategory::EquityHni => &self.config.hni,
        };
        let multipliers = &self.config.multipliers;
        let m: Decimal = match tier {
            RiskTier::Low => multipliers.low,
            RiskTier::Moderate => multipliers.moderate,
            RiskTier::High => multipliers.high,
            RiskTier::VeryHigh => multipliers.very_high,
        };
        LimitProfile {
            category,
            risk_tier: tier,
            single_instrument_cap: base.single_instrument * m,
            aggregate_cap: base.aggregate * m,
            fno_gross_cap: base.fno_gross * m,
            fno_net_cap: base.fno_net * m,
            daily_loss_cap: base.daily_loss * m,
            fallback,
        }
    }
}

/// In-memory profile source, fed by the caller
#[derive(Default)]
pub struct StaticProfileSource {
    profiles: RwLock<HashMap<AccountId, AccountProfile>>,
}

impl StaticProfileSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile; returns the previous one
    pub fn insert(&self, account_id: impl Into<AccountId>, profile: AccountProfile) -> Option<AccountProfile> {
        self.profiles.write().insert(account_id.into(), profile)
    }

    /// Remove a profile
    pub fn remove(&self, account_id: &str) -> Option<AccountProfile> {
        self.profiles.write().remove(account_id)
    }
}

impl ProfileSource for StaticProfileSource {
    fn fetch(&self, account_id: &str) -> Result<AccountProfile, ProfileError> {
        self.profiles
            .read()
            .get(account_id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(account_id.to_string()))
    }
}
