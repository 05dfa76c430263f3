//! Sweep entry points: `start`, `reset_process` and `status`.
//!
//! A `Sweeper` owns no traversal state of its own. Every invocation reads the
//! checkpoint, runs one bounded pass, and either cleans up or leaves exactly
//! one resume trigger behind.

use crate::backend::DriveTree;
use crate::checkpoint::{self, CheckpointStore};
use crate::clock::{Clock, SystemClock};
use crate::config::SweepSettings;
use crate::error::SweepError;
use crate::scheduler::{RunOutcome, RunStats, Scheduler};
use crate::traversal::{QueueSnapshot, TraversalState};
use crate::trigger::{ResumeController, Trigger, TriggerApi};
use crate::types::NodeId;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// What one `start` invocation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReport {
    pub root_id: NodeId,
    /// `true` when an existing checkpoint was picked up
    pub resumed: bool,
    pub outcome: RunOutcome,
    pub stats: RunStats,
    /// Resume trigger left behind, if work remains
    pub trigger: Option<Trigger>,
    /// Queue sizes at the end of the invocation
    pub queues: QueueSnapshot,
}

impl StartReport {
    pub fn is_complete(&self) -> bool {
        self.trigger.is_none()
    }
}

/// What `reset_process` discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub checkpoint_keys_removed: usize,
    pub triggers_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SweepStatus {
    /// No process running
    Idle,
    Running {
        root_id: NodeId,
        queues: QueueSnapshot,
        next_resume: Option<Trigger>,
    },
}

pub struct Sweeper {
    settings: SweepSettings,
    store: Arc<dyn CheckpointStore>,
    tree: Arc<dyn DriveTree>,
    resume: ResumeController,
    clock: Arc<dyn Clock>,
}

impl Sweeper {
    pub fn new(
        settings: SweepSettings,
        store: Arc<dyn CheckpointStore>,
        tree: Arc<dyn DriveTree>,
        triggers: Arc<dyn TriggerApi>,
    ) -> Self {
        let resume = ResumeController::new(
            triggers,
            settings.entry_point.clone(),
            settings.resume_delay(),
        );
        Self {
            settings,
            store,
            tree,
            resume,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock used for the time budget.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    /// Initialize or resume, run one bounded pass, then clean up or schedule
    /// the next invocation.
    pub async fn start(&self) -> Result<StartReport, SweepError> {
        let started_ms = self.clock.now_millis();
        let (mut state, resumed) = self.load_or_initialize()?;

        let budget_ms = u64::try_from(self.settings.time_budget().as_millis()).unwrap_or(u64::MAX);
        let scheduler = Scheduler::new(
            self.tree.as_ref(),
            self.store.as_ref(),
            self.clock.as_ref(),
            budget_ms,
        );
        let (outcome, stats) = scheduler.run(&mut state, started_ms).await?;

        let trigger = match outcome {
            RunOutcome::Suspended {
                work_remaining: true,
            } => Some(self.resume.schedule_resume()?),
            RunOutcome::Complete | RunOutcome::Suspended { .. } => {
                self.finish(&state)?;
                None
            }
        };

        info!(
            root_id = %state.root_id,
            outcome = ?outcome,
            steps = stats.steps,
            files_reset = stats.files_reset,
            folders_expanded = stats.folders_expanded,
            failed = stats.failed,
            permission_failures = stats.permission_failures,
            elapsed_ms = stats.elapsed_ms,
            folder_queue = state.folder_queue.len(),
            file_queue = state.file_queue.len(),
            "Sweep invocation finished"
        );

        Ok(StartReport {
            queues: state.snapshot(),
            root_id: state.root_id,
            resumed,
            outcome,
            stats,
            trigger,
        })
    }

    /// Discard all checkpoint state and every pending resume trigger.
    ///
    /// Works on a corrupt checkpoint too; this is the operator's way out.
    pub fn reset_process(&self) -> Result<ResetSummary, SweepError> {
        let triggers_removed = self.resume.clear()?;
        let checkpoint_keys_removed = checkpoint::stored_key_count(self.store.as_ref())?;
        checkpoint::clear_state(self.store.as_ref())?;
        info!(
            checkpoint_keys_removed,
            triggers_removed, "Sweep state reset"
        );
        Ok(ResetSummary {
            checkpoint_keys_removed,
            triggers_removed,
        })
    }

    /// Read-only view of the checkpoint.
    pub fn status(&self) -> Result<SweepStatus, SweepError> {
        match checkpoint::load_state(self.store.as_ref())? {
            None => Ok(SweepStatus::Idle),
            Some(state) => Ok(SweepStatus::Running {
                queues: state.snapshot(),
                root_id: state.root_id,
                next_resume: self.resume.pending()?.into_iter().next(),
            }),
        }
    }

    /// Pending resume triggers for this sweep's entry point.
    pub fn pending_triggers(&self) -> Result<Vec<Trigger>, SweepError> {
        self.resume.pending()
    }

    fn load_or_initialize(&self) -> Result<(TraversalState, bool), SweepError> {
        if let Some(state) = checkpoint::load_state(self.store.as_ref())? {
            if let Some(configured) = self.configured_root()? {
                if configured != state.root_id {
                    return Err(SweepError::RootMismatch {
                        persisted: state.root_id,
                        configured,
                    });
                }
            }
            info!(
                root_id = %state.root_id,
                folder_queue = state.folder_queue.len(),
                file_queue = state.file_queue.len(),
                processed_folders = state.processed_folders.len(),
                processed_files = state.processed_files.len(),
                "Resuming sweep"
            );
            return Ok((state, true));
        }

        let root = self.settings.root()?;
        let state = TraversalState::initialize(root);
        checkpoint::save_state(self.store.as_ref(), &state)?;
        info!(root_id = %state.root_id, "Starting new sweep");
        Ok((state, false))
    }

    /// `None` when no root is configured; a resume can proceed on the
    /// persisted root alone.
    fn configured_root(&self) -> Result<Option<NodeId>, SweepError> {
        match self.settings.root() {
            Ok(root) => Ok(Some(root)),
            Err(SweepError::MissingRoot) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn finish(&self, state: &TraversalState) -> Result<(), SweepError> {
        let removed = self.resume.clear()?;
        if removed > 1 {
            warn!(removed, "More than one resume trigger was pending");
        }
        checkpoint::clear_state(self.store.as_ref())?;
        info!(
            root_id = %state.root_id,
            processed_folders = state.processed_folders.len(),
            processed_files = state.processed_files.len(),
            "Sweep complete, checkpoint cleared"
        );
        Ok(())
    }
}
