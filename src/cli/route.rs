//! CLI route: single route table and run context. Dispatches to the sweep
//! engine and presentation.

use crate::backend::{DriveRestClient, DriveTree, InMemoryDrive};
use crate::checkpoint::persistence::to_storage_io;
use crate::checkpoint::SledCheckpointStore;
use crate::clock::now_millis;
use crate::config::{BackendKind, ConfigLoader, GrantSweepConfig};
use crate::engine::{StartReport, Sweeper};
use crate::error::{StorageError, SweepError};
use crate::trigger::SledTriggerStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::cli::help::{command_name, is_mutating};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_reset_summary, format_start_report_text, format_status_text, format_triggers_text,
    to_json,
};

/// Runtime context for CLI execution: effective config and the opened store.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    config: GrantSweepConfig,
    workspace_root: PathBuf,
    db: sled::Db,
}

/// The tree a command runs against, plus where to write it back.
struct Backend {
    tree: Arc<dyn DriveTree>,
    snapshot: Option<(InMemoryDrive, PathBuf)>,
}

impl RunContext {
    /// Create run context from workspace root, optional config path and an
    /// optional root override.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        root_override: Option<String>,
    ) -> Result<Self, SweepError> {
        let mut config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        if let Some(root) = root_override {
            config.sweep.root_id = Some(root);
        }
        config.ensure_valid()?;

        let store_path = resolve_path(&workspace_root, &config.storage.store_path);
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let db = sled::open(&store_path).map_err(to_storage_io)?;
        debug!(store_path = %store_path.display(), "Store opened");

        Ok(Self {
            config,
            workspace_root,
            db,
        })
    }

    pub fn config(&self) -> &GrantSweepConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, SweepError> {
        let started = Instant::now();
        let result = self.execute_inner(command).await;
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        if is_mutating(command) {
            self.db.flush_async().await.map_err(to_storage_io)?;
        }
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, SweepError> {
        match command {
            Commands::Start { format } => {
                let backend = self.open_backend()?;
                let sweeper = self.sweeper(Arc::clone(&backend.tree))?;
                let report = sweeper.start().await;
                self.write_back(&backend)?;
                let report = report?;
                if format == "json" {
                    to_json(&report)
                } else {
                    Ok(format_start_report_text(&report))
                }
            }
            Commands::Run { max_invocations } => {
                let backend = self.open_backend()?;
                let sweeper = self.sweeper(Arc::clone(&backend.tree))?;
                self.run_until_complete(&sweeper, &backend, *max_invocations)
                    .await
            }
            Commands::Reset { yes } => {
                if !*yes {
                    use dialoguer::Confirm;
                    let confirmed = Confirm::new()
                        .with_prompt("Discard all sweep progress and pending triggers?")
                        .interact()
                        .map_err(|e| {
                            SweepError::ConfigError(format!("Failed to get user input: {}", e))
                        })?;
                    if !confirmed {
                        return Ok("Reset cancelled".to_string());
                    }
                }
                let summary = self.offline_sweeper()?.reset_process()?;
                Ok(format_reset_summary(&summary))
            }
            Commands::Status { format } => {
                let status = self.offline_sweeper()?.status()?;
                if format == "json" {
                    to_json(&status)
                } else {
                    Ok(format_status_text(&status))
                }
            }
            Commands::Triggers { format } => {
                let triggers = self.offline_sweeper()?.pending_triggers()?;
                if format == "json" {
                    to_json(&triggers)
                } else {
                    Ok(format_triggers_text(&triggers))
                }
            }
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| SweepError::ConfigError(format!("Failed to render config: {}", e))),
        }
    }

    /// Host loop: invoke, wait for the resume trigger to fall due, repeat.
    async fn run_until_complete(
        &self,
        sweeper: &Sweeper,
        backend: &Backend,
        max_invocations: Option<u32>,
    ) -> Result<String, SweepError> {
        let mut invocations: u32 = 0;

        loop {
            let report = sweeper.start().await;
            self.write_back(backend)?;
            self.db.flush_async().await.map_err(to_storage_io)?;
            let report = report?;
            invocations += 1;

            let Some(due_at_ms) = report.trigger.as_ref().map(|t| t.due_at_ms) else {
                return Ok(format!(
                    "{}\nFinished after {} invocation(s)",
                    format_start_report_text(&report),
                    invocations
                ));
            };

            if max_invocations.is_some_and(|max| invocations >= max) {
                return Ok(stopped_early(&report, invocations));
            }

            let wait = Duration::from_millis(due_at_ms.saturating_sub(now_millis()));
            info!(
                invocation = invocations,
                wait_ms = wait.as_millis() as u64,
                folder_queue = report.queues.folder_queue,
                file_queue = report.queues.file_queue,
                "Waiting for resume trigger"
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn sweeper(&self, tree: Arc<dyn DriveTree>) -> Result<Sweeper, SweepError> {
        let store = SledCheckpointStore::new(self.db.clone())?;
        let triggers = SledTriggerStore::new(self.db.clone())?;
        Ok(Sweeper::new(
            self.config.sweep.clone(),
            Arc::new(store),
            tree,
            Arc::new(triggers),
        ))
    }

    /// Reset, status and triggers never touch the tree, so they run without
    /// credentials.
    fn offline_sweeper(&self) -> Result<Sweeper, SweepError> {
        self.sweeper(Arc::new(InMemoryDrive::new()))
    }

    fn open_backend(&self) -> Result<Backend, SweepError> {
        let backend = &self.config.backend;
        match backend.kind {
            BackendKind::Drive => {
                let token = std::env::var(&backend.token_env).map_err(|_| {
                    SweepError::ConfigError(format!(
                        "Drive access token not found in environment variable {}",
                        backend.token_env
                    ))
                })?;
                let client = DriveRestClient::new(
                    backend.endpoint.clone(),
                    token,
                    Duration::from_secs(backend.request_timeout_secs),
                )?;
                info!(endpoint = client.endpoint(), "Using Drive REST backend");
                Ok(Backend {
                    tree: Arc::new(client),
                    snapshot: None,
                })
            }
            BackendKind::Snapshot => {
                let path = backend.snapshot_path.as_ref().ok_or_else(|| {
                    SweepError::ConfigError("snapshot backend requires snapshot_path".to_string())
                })?;
                let path = resolve_path(&self.workspace_root, path);
                let drive = InMemoryDrive::load_snapshot_file(&path)?;
                info!(snapshot = %path.display(), "Using snapshot backend");
                Ok(Backend {
                    tree: Arc::new(drive.clone()),
                    snapshot: Some((drive, path)),
                })
            }
        }
    }

    /// Persist snapshot-backed trees after every invocation, successful or not.
    fn write_back(&self, backend: &Backend) -> Result<(), SweepError> {
        if let Some((drive, path)) = &backend.snapshot {
            drive.save_snapshot_file(path)?;
            debug!(snapshot = %path.display(), "Snapshot written back");
        }
        Ok(())
    }
}

fn stopped_early(report: &StartReport, invocations: u32) -> String {
    format!(
        "{}\nStopped after {} invocation(s); a resume trigger is still pending",
        format_start_report_text(report),
        invocations
    )
}

fn resolve_path(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}
