//! Persisted key-value settings store.
//!
//! Every value is a JSON document owned by one component. Writes always
//! replace the whole value; nothing is merged at the storage layer.

pub mod file_storage;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::Result;

pub use file_storage::FileStorage;

pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite the value stored under `key`.
    fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Storage kept in memory only, lost on drop
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_overwrites() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("pk").unwrap(), None);

        storage.set("pk", "{}".to_owned()).unwrap();
        storage.set("pk", "{\"a\":1}".to_owned()).unwrap();
        assert_eq!(storage.get("pk").unwrap().as_deref(), Some("{\"a\":1}"));
    }
}
