//! State store module
//!
//! Persistence collaborator for per-account ledger and breaker state.
//! Writes for an account are already serialized by the caller, so stores
//! are last-writer-wins.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::breaker::BreakerState;
use crate::ledger::LedgerSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted state of one account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Positions, applied fills and day baseline
    pub ledger: LedgerSnapshot,
    /// Active breaker trip, if any
    #[serde(default)]
    pub breaker: Option<BreakerState>,
}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Account id unusable as a storage key
    #[error("Invalid account key: {0}")]
    InvalidKey(String),
    /// Backend unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for account state persistence
pub trait StateStore: Send + Sync {
    /// Load an account's state; `None` for unknown accounts
    fn load(&self, account_id: &str) -> Result<Option<AccountSnapshot>, StoreError>;
    /// Save an account's state, replacing what was there
    fn save(&self, account_id: &str, snapshot: &AccountSnapshot) -> Result<(), StoreError>;
}
