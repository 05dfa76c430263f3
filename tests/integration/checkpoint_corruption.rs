//! Corrupt checkpoints are surfaced, never silently overwritten

use super::test_utils::{scenario_drive, sweeper};
use grant_sweep::checkpoint::{CheckpointKey, CheckpointStore, MemoryCheckpointStore};
use grant_sweep::error::SweepError;
use grant_sweep::trigger::MemoryTriggers;
use std::collections::BTreeMap;
use std::sync::Arc;

fn corrupt_store() -> MemoryCheckpointStore {
    let mut values = BTreeMap::new();
    values.insert("processing".to_string(), "true".to_string());
    values.insert("rootId".to_string(), "\"R\"".to_string());
    values.insert("folderQueue".to_string(), "[\"S\"".to_string());
    values.insert("fileQueue".to_string(), "[]".to_string());
    values.insert("processedFolders".to_string(), "{\"R\":true}".to_string());
    values.insert("processedFiles".to_string(), "{}".to_string());
    MemoryCheckpointStore::from_dump(values)
}

#[tokio::test]
async fn test_unparseable_queue_is_fatal_and_preserved() {
    let drive = scenario_drive();
    let store = Arc::new(corrupt_store());
    let before = store.dump();
    let sweeper = sweeper(&drive, store.clone(), Arc::new(MemoryTriggers::new()), 300, 1);

    match sweeper.start().await {
        Err(SweepError::CheckpointCorrupt { key, .. }) => assert_eq!(key, "folderQueue"),
        other => panic!("expected CheckpointCorrupt, got {:?}", other.map(|r| r.outcome)),
    }
    assert_eq!(store.dump(), before, "corrupt state must not be overwritten");
    assert_eq!(drive.expansions("R"), 0);
    assert!(matches!(
        sweeper.status(),
        Err(SweepError::CheckpointCorrupt { .. })
    ));
}

#[tokio::test]
async fn test_missing_key_during_run_is_corrupt() {
    let drive = scenario_drive();
    let store = Arc::new(corrupt_store());
    store.delete(CheckpointKey::FolderQueue.as_str()).unwrap();
    store.delete(CheckpointKey::ProcessedFiles.as_str()).unwrap();
    let sweeper = sweeper(&drive, store.clone(), Arc::new(MemoryTriggers::new()), 300, 1);

    let err = sweeper.start().await.unwrap_err();
    assert!(matches!(err, SweepError::CheckpointCorrupt { ref key, .. } if key == "folderQueue"));
}

#[tokio::test]
async fn test_orphan_keys_without_run_flag_are_corrupt() {
    let drive = scenario_drive();
    let store = Arc::new(corrupt_store());
    store.delete(CheckpointKey::Processing.as_str()).unwrap();
    let sweeper = sweeper(&drive, store.clone(), Arc::new(MemoryTriggers::new()), 300, 1);

    assert!(matches!(
        sweeper.start().await,
        Err(SweepError::CheckpointCorrupt { .. })
    ));
}

/// `reset_process` is the way out of a corrupt checkpoint.
#[tokio::test]
async fn test_reset_recovers_from_corruption() {
    let drive = scenario_drive();
    let store = Arc::new(corrupt_store());
    let sweeper = sweeper(&drive, store.clone(), Arc::new(MemoryTriggers::new()), 300, 1);

    let summary = sweeper.reset_process().unwrap();
    assert_eq!(summary.checkpoint_keys_removed, 6);
    assert!(store.is_empty());

    let report = sweeper.start().await.unwrap();
    assert!(report.is_complete());
    assert!(!report.resumed);
}
