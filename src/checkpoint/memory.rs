//! In-memory checkpoint store

use crate::checkpoint::CheckpointStore;
use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Process-local store; state is lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored key and value
    pub fn dump(&self) -> BTreeMap<String, String> {
        self.values.read().clone()
    }

    /// Build a store pre-populated from a previous `dump`
    pub fn from_dump(values: BTreeMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().remove(key);
        Ok(())
    }

    fn save_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut values = self.values.write();
        for (key, value) in entries {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn delete_batch(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut values = self.values.write();
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
