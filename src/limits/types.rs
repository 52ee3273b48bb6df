//! Limit catalog types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Client classification as reported by the profile collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Retail individual
    Individual,
    /// High net-worth individual
    Hni,
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INDIVIDUAL" => Ok(Classification::Individual),
            "HNI" => Ok(Classification::Hni),
            other => Err(format!("unknown classification: {other}")),
        }
    }
}

/// Risk appetite tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "LOW" => Ok(RiskTier::Low),
            "MODERATE" => Ok(RiskTier::Moderate),
            "HIGH" => Ok(RiskTier::High),
            "VERY_HIGH" => Ok(RiskTier::VeryHigh),
            other => Err(format!("unknown risk tier: {other}")),
        }
    }
}

/// Catalog key the base caps are looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitCategory {
    EquityIndividual,
    EquityHni,
}

impl fmt::Display for LimitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitCategory::EquityIndividual => f.write_str("EQUITY_INDIVIDUAL"),
            LimitCategory::EquityHni => f.write_str("EQUITY_HNI"),
        }
    }
}

/// Account attributes limits are derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Reported classification
    pub classification: Classification,
    /// Risk tier; `None` means the profile is incomplete
    #[serde(default)]
    pub risk_tier: Option<RiskTier>,
    /// Declared net worth
    #[serde(default)]
    pub net_worth: Option<Decimal>,
}

/// Resolved numeric limits for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitProfile {
    /// Catalog category
    pub category: LimitCategory,
    /// Tier the caps were scaled by
    pub risk_tier: RiskTier,
    /// Cap on a single instrument's exposure
    pub single_instrument_cap: Decimal,
    /// Cap on total exposure
    pub aggregate_cap: Decimal,
    /// Cap on gross derivative exposure
    pub fno_gross_cap: Decimal,
    /// Cap on net derivative exposure
    pub fno_net_cap: Decimal,
    /// Daily loss limit for the circuit breaker
    pub daily_loss_cap: Decimal,
    /// True when resolved from the conservative fallback
    pub fallback: bool,
}

/// Profile lookup errors
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    /// No profile exists for the account
    #[error("No profile for account {0}")]
    NotFound(String),
    /// The profile collaborator could not answer
    #[error("Profile source unavailable for account {account}: {reason}")]
    Unavailable { account: String, reason: String },
}

/// Collaborator that supplies account profiles
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile of an account
    fn fetch(&self, account_id: &str) -> Result<AccountProfile, ProfileError>;
}
