//! JSON file state store, one file per account

use super::{AccountSnapshot, StateStore, StoreError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each account as `<dir>/<account_id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, account_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !account_id.is_empty()
            && account_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(account_id.to_string()));
        }
        Ok(self.dir.join(format!("{account_id}.json")))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, account_id: &str) -> Result<Option<AccountSnapshot>, StoreError> {
        let path = self.path_for(account_id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, account_id: &str, snapshot: &AccountSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(account_id)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        // Rename so readers never see a half-written file
        fs::rename(&tmp, &path)?;
        tracing::debug!(account = account_id, path = %path.display(), "Saved account state");
        Ok(())
    }
}
