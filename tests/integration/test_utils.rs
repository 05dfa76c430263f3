//! Shared fixtures for integration tests

use grant_sweep::backend::InMemoryDrive;
use grant_sweep::checkpoint::CheckpointStore;
use grant_sweep::clock::SteppingClock;
use grant_sweep::config::SweepSettings;
use grant_sweep::engine::Sweeper;
use grant_sweep::trigger::TriggerApi;
use grant_sweep::types::{AccessLevel, Audience, NodeKind};
use std::sync::Arc;

/// R contains F1 and S; S contains F2. Every node carries some grant.
pub fn scenario_drive() -> InMemoryDrive {
    let drive = InMemoryDrive::new();
    drive
        .add_folder(None, "R")
        .add_file("R", "F1")
        .add_folder(Some("R"), "S")
        .add_file("S", "F2")
        .set_owner("R", "owner@example.com")
        .grant_editor("R", "team@example.com")
        .grant_editor("F1", "alice@example.com")
        .grant_viewer("F1", "bob@example.com")
        .share_publicly("S", Audience::Anyone, AccessLevel::Comment)
        .grant_viewer("F2", "carol@example.com")
        .share_publicly("F2", Audience::AnyoneWithLink, AccessLevel::Edit);
    drive
}

/// A wider tree: `folders` subfolders under R, each holding `files` files.
pub fn wide_drive(folders: usize, files: usize) -> InMemoryDrive {
    let drive = InMemoryDrive::new();
    drive.add_folder(None, "R");
    for f in 0..folders {
        let folder = format!("D{}", f);
        drive.add_folder(Some("R"), &folder);
        for i in 0..files {
            let file = format!("D{}-F{}", f, i);
            drive
                .add_file(&folder, &file)
                .grant_editor(&file, "editor@example.com");
        }
    }
    drive
}

pub fn settings(root: &str, budget_secs: u64) -> SweepSettings {
    SweepSettings {
        root_id: Some(root.to_string()),
        time_budget_secs: budget_secs,
        ..SweepSettings::default()
    }
}

/// Sweeper over the given collaborators whose clock advances `step_ms` per
/// read, so a 1s budget with 600ms steps yields exactly one node per call.
pub fn sweeper(
    drive: &InMemoryDrive,
    store: Arc<dyn CheckpointStore>,
    triggers: Arc<dyn TriggerApi>,
    budget_secs: u64,
    step_ms: u64,
) -> Sweeper {
    Sweeper::new(
        settings("R", budget_secs),
        store,
        Arc::new(drive.clone()),
        triggers,
    )
    .with_clock(Arc::new(SteppingClock::new(1_000_000, step_ms)))
}

/// Every node was reset exactly once and every folder listed exactly once.
pub fn assert_each_node_processed_once(drive: &InMemoryDrive) {
    for id in drive.ids_of_kind(NodeKind::File) {
        assert_eq!(
            drive.access_calls(id.as_str()),
            Audience::ALL.len(),
            "file {} should be reset exactly once",
            id
        );
    }
    for id in drive.ids_of_kind(NodeKind::Folder) {
        assert_eq!(
            drive.expansions(id.as_str()),
            1,
            "folder {} should be expanded exactly once",
            id
        );
        assert_eq!(
            drive.access_calls(id.as_str()),
            Audience::ALL.len(),
            "folder {} should be reset exactly once",
            id
        );
    }
}

pub fn assert_locked_down(drive: &InMemoryDrive) {
    for (id, node) in drive.snapshot().nodes {
        assert!(node.is_locked_down(), "node {} still has grants: {:?}", id, node);
    }
}
