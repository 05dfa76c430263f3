//! Checkpoint Store
//!
//! Durable key-value persistence for traversal state. The raw store only
//! deals in text values; the typed helpers here own the key layout and the
//! JSON contract, and validate everything they read back.

pub mod memory;
pub mod persistence;

pub use memory::MemoryCheckpointStore;
pub use persistence::SledCheckpointStore;

use crate::error::{StorageError, SweepError};
use crate::traversal::{ProcessedSet, TraversalState};
use crate::types::NodeId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::io;

/// Raw key-value store for checkpoint text values
pub trait CheckpointStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Write several keys. Stores that can apply this atomically should.
    fn save_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.save(key, value)?;
        }
        Ok(())
    }

    /// Delete several keys. Stores that can apply this atomically should.
    fn delete_batch(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

/// Logical keys of the persisted state layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKey {
    Processing,
    RootId,
    FolderQueue,
    FileQueue,
    ProcessedFolders,
    ProcessedFiles,
}

impl CheckpointKey {
    pub const ALL: [CheckpointKey; 6] = [
        CheckpointKey::Processing,
        CheckpointKey::RootId,
        CheckpointKey::FolderQueue,
        CheckpointKey::FileQueue,
        CheckpointKey::ProcessedFolders,
        CheckpointKey::ProcessedFiles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointKey::Processing => "processing",
            CheckpointKey::RootId => "rootId",
            CheckpointKey::FolderQueue => "folderQueue",
            CheckpointKey::FileQueue => "fileQueue",
            CheckpointKey::ProcessedFolders => "processedFolders",
            CheckpointKey::ProcessedFiles => "processedFiles",
        }
    }
}

/// Load the in-progress traversal, if any.
///
/// Returns `Ok(None)` only when no checkpoint key exists at all (or the run
/// flag is explicitly `false` with nothing else stored). Anything partial or
/// unparseable is reported as `CheckpointCorrupt` so partial progress is
/// never silently overwritten.
pub fn load_state(store: &dyn CheckpointStore) -> Result<Option<TraversalState>, SweepError> {
    let processing = match store.load(CheckpointKey::Processing.as_str())? {
        Some(raw) => decode::<bool>(CheckpointKey::Processing, &raw)?,
        None => false,
    };

    if !processing {
        ensure_no_residue(store)?;
        return Ok(None);
    }

    let root_id: NodeId = decode(CheckpointKey::RootId, &required(store, CheckpointKey::RootId)?)?;
    if root_id.is_empty() {
        return Err(corrupt(CheckpointKey::RootId, "root id is empty"));
    }

    let folder_queue: VecDeque<NodeId> = decode(
        CheckpointKey::FolderQueue,
        &required(store, CheckpointKey::FolderQueue)?,
    )?;
    let file_queue: VecDeque<NodeId> = decode(
        CheckpointKey::FileQueue,
        &required(store, CheckpointKey::FileQueue)?,
    )?;
    let processed_folders: ProcessedSet = decode(
        CheckpointKey::ProcessedFolders,
        &required(store, CheckpointKey::ProcessedFolders)?,
    )?;
    let processed_files: ProcessedSet = decode(
        CheckpointKey::ProcessedFiles,
        &required(store, CheckpointKey::ProcessedFiles)?,
    )?;

    if folder_queue.iter().any(NodeId::is_empty) {
        return Err(corrupt(CheckpointKey::FolderQueue, "contains an empty node id"));
    }
    if file_queue.iter().any(NodeId::is_empty) {
        return Err(corrupt(CheckpointKey::FileQueue, "contains an empty node id"));
    }

    Ok(Some(TraversalState {
        root_id,
        folder_queue,
        file_queue,
        processed_folders,
        processed_files,
    }))
}

/// Persist every key of the state, with the run flag set.
pub fn save_state(store: &dyn CheckpointStore, state: &TraversalState) -> Result<(), StorageError> {
    let entries = [
        (CheckpointKey::Processing.as_str(), encode(&true)?),
        (CheckpointKey::RootId.as_str(), encode(&state.root_id)?),
        (CheckpointKey::FolderQueue.as_str(), encode(&state.folder_queue)?),
        (CheckpointKey::FileQueue.as_str(), encode(&state.file_queue)?),
        (
            CheckpointKey::ProcessedFolders.as_str(),
            encode(&state.processed_folders)?,
        ),
        (
            CheckpointKey::ProcessedFiles.as_str(),
            encode(&state.processed_files)?,
        ),
    ];
    store.save_batch(&entries)
}

/// Delete every checkpoint key as one logical unit.
pub fn clear_state(store: &dyn CheckpointStore) -> Result<(), StorageError> {
    let keys: Vec<&str> = CheckpointKey::ALL.iter().map(|k| k.as_str()).collect();
    store.delete_batch(&keys)
}

/// Number of checkpoint keys currently present.
pub fn stored_key_count(store: &dyn CheckpointStore) -> Result<usize, StorageError> {
    let mut count = 0;
    for key in CheckpointKey::ALL {
        if store.load(key.as_str())?.is_some() {
            count += 1;
        }
    }
    Ok(count)
}

fn ensure_no_residue(store: &dyn CheckpointStore) -> Result<(), SweepError> {
    for key in CheckpointKey::ALL.iter().skip(1) {
        if store.load(key.as_str())?.is_some() {
            return Err(corrupt(*key, "present without an active run flag"));
        }
    }
    Ok(())
}

fn required(store: &dyn CheckpointStore, key: CheckpointKey) -> Result<String, SweepError> {
    store
        .load(key.as_str())?
        .ok_or_else(|| corrupt(key, "missing while a run is in progress"))
}

fn decode<T: DeserializeOwned>(key: CheckpointKey, raw: &str) -> Result<T, SweepError> {
    serde_json::from_str(raw).map_err(|e| corrupt(key, &e.to_string()))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value)
        .map_err(|e| StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, e)))
}

fn corrupt(key: CheckpointKey, reason: &str) -> SweepError {
    SweepError::CheckpointCorrupt {
        key: key.as_str().to_string(),
        reason: reason.to_string(),
    }
}
