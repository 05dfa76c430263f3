//! Node and permission failures are absorbed; the sweep still completes

use super::test_utils::{scenario_drive, sweeper};
use grant_sweep::backend::FailPoint;
use grant_sweep::checkpoint::{self, MemoryCheckpointStore};
use grant_sweep::scheduler::RunOutcome;
use grant_sweep::trigger::{MemoryTriggers, TriggerApi};
use grant_sweep::types::NodeId;
use std::sync::Arc;

#[tokio::test]
async fn test_start_completes_through_revoke_and_lookup_failures() {
    let drive = scenario_drive();
    drive
        .fail("F1", FailPoint::RevokeEditor)
        .fail("S", FailPoint::Lookup);
    let store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());
    let sweeper = sweeper(&drive, store.clone(), triggers.clone(), 300, 1);

    let report = sweeper.start().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Complete);
    assert!(report.is_complete());
    // R, F1 and S; F2 is never discovered because S could not be read.
    assert_eq!(report.stats.steps, 3);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.permission_failures, 1);

    let f1 = drive.node_state("F1").unwrap();
    assert!(f1.editors.iter().any(|e| e == "alice@example.com"));
    assert!(f1.viewers.iter().all(|v| v.is_empty()));
    assert_eq!(drive.expansions("S"), 0);
    assert_eq!(drive.access_calls("F2"), 0);

    assert_eq!(checkpoint::stored_key_count(store.as_ref()).unwrap(), 0);
    assert!(triggers.list_triggers().unwrap().is_empty());
}

/// A node whose grants could not all be revoked is still marked processed,
/// so a resumed run never visits it again.
#[tokio::test]
async fn test_failed_node_is_not_retried_after_resume() {
    let drive = scenario_drive();
    drive
        .fail("F1", FailPoint::RevokeEditor)
        .fail("S", FailPoint::Lookup);
    let store = Arc::new(MemoryCheckpointStore::new());
    let triggers = Arc::new(MemoryTriggers::new());
    let stepper = sweeper(&drive, store.clone(), triggers.clone(), 1, 600);

    // One node per invocation: R, then F1.
    for _ in 0..2 {
        let report = stepper.start().await.unwrap();
        assert!(!report.is_complete());
    }
    let state = checkpoint::load_state(store.as_ref()).unwrap().unwrap();
    assert!(state.is_file_processed(&NodeId::from("F1")));
    assert!(!state.is_quiescent());
    let f1_calls = drive.access_calls("F1");

    let report = stepper.start().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.stats.steps, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(drive.access_calls("F1"), f1_calls);
    assert_eq!(checkpoint::stored_key_count(store.as_ref()).unwrap(), 0);
    assert!(triggers.list_triggers().unwrap().is_empty());
}
