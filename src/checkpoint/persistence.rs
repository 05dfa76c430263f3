//! Sled-backed checkpoint store

use crate::checkpoint::CheckpointStore;
use crate::error::StorageError;
use sled::{Db, Tree};
use std::io;
use std::path::Path;

const TREE_CHECKPOINT: &str = "checkpoint";

/// Checkpoint keys in a dedicated sled tree; batches are applied atomically.
#[derive(Clone)]
pub struct SledCheckpointStore {
    db: Db,
    tree: Tree,
}

impl SledCheckpointStore {
    /// Open (or create) a sled database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::new(db)
    }

    /// Use an already opened database (shared with the trigger store)
    pub fn new(db: Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_CHECKPOINT).map_err(to_storage_io)?;
        Ok(Self { db, tree })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.tree.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

impl CheckpointStore for SledCheckpointStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.tree.get(key.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let value = String::from_utf8(raw.to_vec()).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Checkpoint value for '{}' is not UTF-8: {}", key, e),
            ))
        })?;
        Ok(Some(value))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(to_storage_io)?;
        self.flush()
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.tree.remove(key.as_bytes()).map_err(to_storage_io)?;
        self.flush()
    }

    fn save_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for (key, value) in entries {
            batch.insert(key.as_bytes(), value.as_bytes());
        }
        self.tree.apply_batch(batch).map_err(to_storage_io)?;
        self.flush()
    }

    fn delete_batch(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for key in keys {
            batch.remove(key.as_bytes());
        }
        self.tree.apply_batch(batch).map_err(to_storage_io)?;
        self.flush()
    }
}

pub(crate) fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}
