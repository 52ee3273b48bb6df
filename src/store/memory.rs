//! In-memory state store

use super::{AccountSnapshot, StateStore, StoreError};
use dashmap::DashMap;

/// Keeps snapshots in a concurrent map
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: DashMap<String, AccountSnapshot>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, account_id: &str) -> Result<Option<AccountSnapshot>, StoreError> {
        Ok(self.snapshots.get(account_id).map(|s| s.value().clone()))
    }

    fn save(&self, account_id: &str, snapshot: &AccountSnapshot) -> Result<(), StoreError> {
        self.snapshots.insert(account_id.to_string(), snapshot.clone());
        Ok(())
    }
}
