//! Breadth-first scenario driven through repeated `start` invocations

use super::test_utils::{assert_each_node_processed_once, assert_locked_down, scenario_drive, sweeper};
use grant_sweep::checkpoint::{self, MemoryCheckpointStore};
use grant_sweep::engine::SweepStatus;
use grant_sweep::scheduler::RunOutcome;
use grant_sweep::traversal::TraversalState;
use grant_sweep::trigger::{MemoryTriggers, TriggerApi};
use grant_sweep::types::NodeId;
use std::sync::Arc;

fn ids(queue: &std::collections::VecDeque<NodeId>) -> Vec<&str> {
    queue.iter().map(NodeId::as_str).collect()
}

fn processed(set: &grant_sweep::traversal::ProcessedSet) -> Vec<&str> {
    set.keys().map(NodeId::as_str).collect()
}

fn persisted(store: &MemoryCheckpointStore) -> TraversalState {
    checkpoint::load_state(store)
        .unwrap()
        .expect("a run should be in progress")
}

/// One node per invocation, checking the persisted queues after each.
#[tokio::test]
async fn test_scenario_one_step_per_invocation() {
    let drive = scenario_drive();
    let store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());
    let sweeper = sweeper(&drive, store.clone(), triggers.clone(), 1, 600);

    // Expand R
    let report = sweeper.start().await.unwrap();
    assert!(!report.resumed);
    assert_eq!(report.outcome, RunOutcome::Suspended { work_remaining: true });
    let state = persisted(&store);
    assert_eq!(ids(&state.folder_queue), vec!["S"]);
    assert_eq!(ids(&state.file_queue), vec!["F1"]);

    // Reset F1 before touching S
    sweeper.start().await.unwrap();
    let state = persisted(&store);
    assert_eq!(ids(&state.folder_queue), vec!["S"]);
    assert!(state.file_queue.is_empty());
    assert_eq!(processed(&state.processed_files), vec!["F1"]);

    // Expand S
    let report = sweeper.start().await.unwrap();
    assert!(report.resumed);
    let state = persisted(&store);
    assert!(state.folder_queue.is_empty());
    assert_eq!(ids(&state.file_queue), vec!["F2"]);
    assert_eq!(processed(&state.processed_folders), vec!["R", "S"]);

    // Reset F2; queues drain exactly as the budget runs out
    let report = sweeper.start().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Suspended { work_remaining: false });
    assert!(report.trigger.is_none());
    assert_eq!(report.queues.processed_folders, 2);
    assert_eq!(report.queues.processed_files, 2);

    assert!(store.is_empty(), "cleanup must remove every checkpoint key");
    assert!(triggers.list_triggers().unwrap().is_empty());
    assert_eq!(sweeper.status().unwrap(), SweepStatus::Idle);
    assert_each_node_processed_once(&drive);
    assert_locked_down(&drive);
}

#[tokio::test]
async fn test_scenario_single_invocation() {
    let drive = scenario_drive();
    let store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());
    let sweeper = sweeper(&drive, store.clone(), triggers.clone(), 300, 1);

    let report = sweeper.start().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Complete);
    assert_eq!(report.stats.files_reset, 2);
    assert_eq!(report.stats.folders_expanded, 2);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.stats.permission_failures, 0);

    let r = drive.node_state("R").unwrap();
    assert_eq!(r.owner.as_deref(), Some("owner@example.com"));
    assert_locked_down(&drive);
    assert!(store.is_empty());
}

/// Calling `start` again after completion begins a brand new sweep.
#[tokio::test]
async fn test_start_after_completion_is_a_fresh_run() {
    let drive = scenario_drive();
    let store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());
    let sweeper = sweeper(&drive, store.clone(), triggers, 300, 1);

    sweeper.start().await.unwrap();
    drive.grant_editor("F2", "late@example.com");
    let report = sweeper.start().await.unwrap();
    assert!(!report.resumed);
    assert_eq!(report.outcome, RunOutcome::Complete);
    assert!(drive.node_state("F2").unwrap().editors.is_empty());
}

/// A deleted subtree is logged and skipped; the sweep still terminates.
#[tokio::test]
async fn test_node_deleted_mid_sweep() {
    let drive = scenario_drive();
    let store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());
    let sweeper = sweeper(&drive, store.clone(), triggers.clone(), 1, 600);

    sweeper.start().await.unwrap();
    drive.remove_node("S");
    drive.remove_node("F1");

    let mut invocations = 1;
    loop {
        let report = sweeper.start().await.unwrap();
        invocations += 1;
        if report.trigger.is_none() {
            break;
        }
        assert!(invocations < 10, "sweep should terminate");
    }
    assert!(store.is_empty());
    assert!(triggers.list_triggers().unwrap().is_empty());
    // F2 was never discovered because S vanished before expansion.
    assert_eq!(drive.access_calls("F2"), 0);
}
