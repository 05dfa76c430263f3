//! CLI run context against a snapshot-file backend

use super::test_utils::scenario_drive;
use grant_sweep::backend::{DriveSnapshot, InMemoryDrive};
use grant_sweep::cli::{Commands, RunContext};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(workspace: &Path, budget_secs: u64) -> PathBuf {
    let config_path = workspace.join("sweep.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[sweep]
root_id = "R"
time_budget_secs = {}
resume_delay_secs = 0

[storage]
store_path = "{}"

[backend]
kind = "snapshot"
snapshot_path = "{}"
"#,
            budget_secs,
            workspace.join("store").display(),
            workspace.join("tree.json").display()
        ),
    )
    .unwrap();
    config_path
}

fn read_snapshot(workspace: &Path) -> DriveSnapshot {
    let raw = std::fs::read_to_string(workspace.join("tree.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_run_command_sweeps_snapshot_to_completion() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path();
    scenario_drive()
        .save_snapshot_file(&workspace.join("tree.json"))
        .unwrap();
    let config_path = write_config(workspace, 60);

    let context = RunContext::new(workspace.to_path_buf(), Some(config_path), None).unwrap();
    let out = context
        .execute(&Commands::Run {
            max_invocations: None,
        })
        .await
        .unwrap();
    assert!(out.contains("Finished after 1 invocation(s)"), "{}", out);

    let snapshot = read_snapshot(workspace);
    assert_eq!(snapshot.nodes.len(), 4);
    assert!(snapshot.nodes.values().all(|n| n.is_locked_down()));

    let triggers = context
        .execute(&Commands::Triggers {
            format: "json".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(triggers.trim(), "[]");
}

#[tokio::test]
async fn test_status_json_reports_idle() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path();
    InMemoryDrive::new()
        .save_snapshot_file(&workspace.join("tree.json"))
        .unwrap();
    let config_path = write_config(workspace, 60);

    let context = RunContext::new(workspace.to_path_buf(), Some(config_path), None).unwrap();
    let out = context
        .execute(&Commands::Status {
            format: "json".to_string(),
        })
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["state"], "idle");
}

#[tokio::test]
async fn test_root_override_conflicting_with_running_sweep() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path();
    let drive = scenario_drive();
    drive.save_snapshot_file(&workspace.join("tree.json")).unwrap();
    let config_path = write_config(workspace, 60);

    // Seed an in-progress run for R directly through the checkpoint layer.
    {
        let store =
            grant_sweep::checkpoint::SledCheckpointStore::open(workspace.join("store")).unwrap();
        let state = grant_sweep::traversal::TraversalState::initialize("R".into());
        grant_sweep::checkpoint::save_state(&store, &state).unwrap();
        store.flush().unwrap();
    }

    let context =
        RunContext::new(workspace.to_path_buf(), Some(config_path), Some("S".to_string())).unwrap();
    let err = context
        .execute(&Commands::Start {
            format: "text".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        grant_sweep::error::SweepError::RootMismatch { .. }
    ));
    assert!(grant_sweep::cli::map_error(&err).contains("grant-sweep reset"));
}
