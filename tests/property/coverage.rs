//! Property-based tests for full coverage under arbitrary suspension points

use grant_sweep::backend::InMemoryDrive;
use grant_sweep::checkpoint::{self, MemoryCheckpointStore};
use grant_sweep::clock::SteppingClock;
use grant_sweep::config::SweepSettings;
use grant_sweep::engine::Sweeper;
use grant_sweep::trigger::{MemoryTriggers, TriggerApi};
use grant_sweep::types::{Audience, NodeKind};
use proptest::prelude::*;
use proptest::sample::Index;
use std::sync::Arc;

/// Each entry adds one node under a previously created folder.
fn build_tree(shape: &[(Index, bool)]) -> InMemoryDrive {
    let drive = InMemoryDrive::new();
    drive.add_folder(None, "root");
    let mut folders = vec!["root".to_string()];

    for (i, (parent, is_folder)) in shape.iter().enumerate() {
        let parent = parent.get(&folders).clone();
        if *is_folder {
            let id = format!("d{}", i);
            drive
                .add_folder(Some(parent.as_str()), &id)
                .grant_viewer(&id, "viewer@example.com");
            folders.push(id);
        } else {
            let id = format!("f{}", i);
            drive
                .add_file(&parent, &id)
                .grant_editor(&id, "editor@example.com");
        }
    }
    drive
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

/// Repeated `start` calls with a random budget/clock step visit every node
/// exactly once and leave no state behind.
#[test]
fn test_coverage_under_random_suspension() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    runner
        .run(
            &(
                prop::collection::vec((any::<Index>(), any::<bool>()), 0..40),
                1u64..1000,
            ),
            |(shape, step_ms)| {
                let drive = build_tree(&shape);
                let total = shape.len() + 1;
                let store = Arc::new(MemoryCheckpointStore::new());
                let triggers = Arc::new(MemoryTriggers::new());
                let settings = SweepSettings {
                    root_id: Some("root".to_string()),
                    time_budget_secs: 1,
                    ..SweepSettings::default()
                };
                let sweeper = Sweeper::new(
                    settings,
                    store.clone(),
                    Arc::new(drive.clone()),
                    triggers.clone(),
                )
                .with_clock(Arc::new(SteppingClock::new(0, step_ms)));

                let rt = runtime();
                let mut invocations = 0;
                let mut steps = 0;
                loop {
                    let report = rt.block_on(sweeper.start()).unwrap();
                    invocations += 1;
                    steps += report.stats.steps as usize;
                    prop_assert!(report.stats.steps >= 1, "every invocation makes progress");
                    prop_assert!(triggers.list_triggers().unwrap().len() <= 1);
                    if report.is_complete() {
                        break;
                    }
                    prop_assert!(invocations <= total + 1);
                }

                prop_assert_eq!(steps, total);
                prop_assert_eq!(triggers.high_water(), 1.min(invocations - 1));
                prop_assert!(triggers.list_triggers().unwrap().is_empty());
                prop_assert_eq!(checkpoint::stored_key_count(store.as_ref()).unwrap(), 0);

                for id in drive.ids_of_kind(NodeKind::Folder) {
                    prop_assert_eq!(drive.expansions(id.as_str()), 1);
                    prop_assert_eq!(drive.access_calls(id.as_str()), Audience::ALL.len());
                }
                for id in drive.ids_of_kind(NodeKind::File) {
                    prop_assert_eq!(drive.access_calls(id.as_str()), Audience::ALL.len());
                }
                for (_, node) in drive.snapshot().nodes {
                    prop_assert!(node.is_locked_down());
                }
                Ok(())
            },
        )
        .unwrap();
}

/// Quiescence is only reported once both queues are empty: a run cut after
/// every single step always has work left until the last node.
#[test]
fn test_no_premature_completion() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(32));

    runner
        .run(
            &prop::collection::vec((any::<Index>(), any::<bool>()), 1..25),
            |shape| {
                let drive = build_tree(&shape);
                let total = shape.len() + 1;
                let store = Arc::new(MemoryCheckpointStore::new());
                let triggers = Arc::new(MemoryTriggers::new());
                let settings = SweepSettings {
                    root_id: Some("root".to_string()),
                    time_budget_secs: 1,
                    ..SweepSettings::default()
                };
                // 600ms per read with a 1s budget: exactly one step per call.
                let sweeper = Sweeper::new(
                    settings,
                    store.clone(),
                    Arc::new(drive.clone()),
                    triggers,
                )
                .with_clock(Arc::new(SteppingClock::new(0, 600)));

                let rt = runtime();
                for n in 1..=total {
                    let report = rt.block_on(sweeper.start()).unwrap();
                    prop_assert_eq!(report.stats.steps, 1);
                    let finished = report.is_complete();
                    prop_assert_eq!(finished, n == total, "completion reported at step {}", n);
                    if !finished {
                        let state = checkpoint::load_state(store.as_ref()).unwrap().unwrap();
                        prop_assert!(!state.is_quiescent());
                    }
                }
                prop_assert!(store.is_empty());
                Ok(())
            },
        )
        .unwrap();
}
