//! Resume correctness: progress survives a process restart

use super::test_utils::{assert_each_node_processed_once, assert_locked_down, sweeper, wide_drive};
use grant_sweep::checkpoint::{self, CheckpointStore, MemoryCheckpointStore, SledCheckpointStore};
use grant_sweep::scheduler::RunOutcome;
use grant_sweep::trigger::{MemoryTriggers, ResumeController, SledTriggerStore, TriggerApi};
use grant_sweep::types::NodeId;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn open_stores(path: &std::path::Path) -> (sled::Db, Arc<SledCheckpointStore>, Arc<SledTriggerStore>) {
    let db = sled::open(path).unwrap();
    let store = Arc::new(SledCheckpointStore::new(db.clone()).unwrap());
    let triggers = Arc::new(SledTriggerStore::new(db.clone()).unwrap());
    (db, store, triggers)
}

fn processed_ids(store: &dyn CheckpointStore) -> BTreeSet<NodeId> {
    let state = checkpoint::load_state(store).unwrap().unwrap();
    state
        .processed_folders
        .keys()
        .chain(state.processed_files.keys())
        .cloned()
        .collect()
}

/// Serialize after k nodes, "restart" from the dump, finish, and check that
/// nothing from the first k was touched again.
#[tokio::test]
async fn test_resume_from_dumped_state() {
    let drive = wide_drive(3, 2);
    let first_store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());

    let first = sweeper(&drive, first_store.clone(), triggers.clone(), 1, 600);
    for _ in 0..4 {
        first.start().await.unwrap();
    }
    let done_before = processed_ids(first_store.as_ref());
    assert_eq!(done_before.len(), 4);
    let calls_before: Vec<(NodeId, usize)> = done_before
        .iter()
        .map(|id| (id.clone(), drive.access_calls(id.as_str())))
        .collect();
    let dump = first_store.dump();
    drop(first);

    let restored = Arc::new(MemoryCheckpointStore::from_dump(dump));
    let second = sweeper(&drive, restored.clone(), triggers.clone(), 300, 1);
    let report = second.start().await.unwrap();
    assert!(report.resumed);
    assert_eq!(report.outcome, RunOutcome::Complete);
    // 1 root + 3 folders + 6 files, minus the 4 already done
    assert_eq!(report.stats.steps, 6);

    for (id, calls) in calls_before {
        assert_eq!(drive.access_calls(id.as_str()), calls, "{} was reprocessed", id);
    }
    assert_each_node_processed_once(&drive);
    assert_locked_down(&drive);
    assert!(restored.is_empty());
    assert!(triggers.list_triggers().unwrap().is_empty());
}

/// The sled-backed stores pick up exactly where a closed database left off.
#[tokio::test]
async fn test_resume_across_sled_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let store_path = temp_dir.path().join("store");
    let drive = wide_drive(2, 3);

    {
        let (db, store, triggers) = open_stores(&store_path);
        let sweeper = sweeper(&drive, store, triggers, 1, 600);
        for _ in 0..3 {
            let report = sweeper.start().await.unwrap();
            assert!(report.trigger.is_some());
        }
        db.flush().unwrap();
    }

    let (_db, store, triggers) = open_stores(&store_path);
    let state = checkpoint::load_state(store.as_ref()).unwrap().unwrap();
    assert_eq!(state.processed_folders.len() + state.processed_files.len(), 3);

    let controller = ResumeController::new(triggers.clone(), "start", Duration::from_secs(60));
    assert_eq!(controller.pending().unwrap().len(), 1);

    let sweeper = sweeper(&drive, store.clone(), triggers.clone(), 300, 1);
    let report = sweeper.start().await.unwrap();
    assert!(report.resumed);
    assert_eq!(report.outcome, RunOutcome::Complete);

    assert_each_node_processed_once(&drive);
    assert_eq!(checkpoint::stored_key_count(store.as_ref()).unwrap(), 0);
    assert!(triggers.list_triggers().unwrap().is_empty());
}

/// Re-enqueued duplicates of processed nodes cost a skip, not a reset.
#[tokio::test]
async fn test_duplicate_entries_in_checkpoint_are_skipped() {
    let drive = wide_drive(1, 1);
    let store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());

    let first = sweeper(&drive, store.clone(), triggers.clone(), 1, 600);
    first.start().await.unwrap();

    let mut state = checkpoint::load_state(store.as_ref()).unwrap().unwrap();
    state.enqueue_folders(vec![NodeId::from("R")]);
    checkpoint::save_state(store.as_ref(), &state).unwrap();

    let second = sweeper(&drive, store.clone(), triggers, 300, 1);
    let report = second.start().await.unwrap();
    assert_eq!(report.stats.skipped, 1);
    assert_each_node_processed_once(&drive);
}
