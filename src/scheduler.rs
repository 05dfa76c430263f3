//! Time-Bounded Scheduler
//!
//! Drains files ahead of folders, one node per step, persisting the whole
//! traversal state after every step. The budget is checked before each step
//! starts; a step in flight always runs to completion.

use crate::backend::{DriveTree, SharedNode};
use crate::checkpoint::{self, CheckpointStore};
use crate::clock::Clock;
use crate::error::{NodeError, SweepError};
use crate::permissions::{reset_permissions, ResetReport};
use crate::traversal::TraversalState;
use crate::types::{NodeId, NodeKind};
use serde::Serialize;
use tracing::{debug, info, warn};

/// How a bounded run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Both queues drained
    Complete,
    /// Budget exhausted before the queues were observed empty
    Suspended { work_remaining: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessed,
}

/// Result of processing a single dequeued node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Reset {
        id: NodeId,
        report: ResetReport,
    },
    Expanded {
        id: NodeId,
        folders: usize,
        files: usize,
        report: ResetReport,
    },
    Skipped {
        id: NodeId,
        kind: NodeKind,
        reason: SkipReason,
    },
    Failed {
        id: NodeId,
        kind: NodeKind,
        error: NodeError,
    },
}

/// Counters for one bounded run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub steps: u64,
    pub files_reset: u64,
    pub folders_expanded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub permission_failures: u64,
    pub elapsed_ms: u64,
}

impl RunStats {
    fn record(&mut self, outcome: &StepOutcome) {
        self.steps += 1;
        match outcome {
            StepOutcome::Reset { report, .. } => {
                self.files_reset += 1;
                self.permission_failures += report.failures.len() as u64;
            }
            StepOutcome::Expanded { report, .. } => {
                self.folders_expanded += 1;
                self.permission_failures += report.failures.len() as u64;
            }
            StepOutcome::Skipped { .. } => self.skipped += 1,
            StepOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

pub struct Scheduler<'a> {
    tree: &'a dyn DriveTree,
    store: &'a dyn CheckpointStore,
    clock: &'a dyn Clock,
    budget_ms: u64,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        tree: &'a dyn DriveTree,
        store: &'a dyn CheckpointStore,
        clock: &'a dyn Clock,
        budget_ms: u64,
    ) -> Self {
        Self {
            tree,
            store,
            clock,
            budget_ms,
        }
    }

    /// Run until the budget measured from `started_ms` is spent or the
    /// traversal is complete. Only checkpoint persistence errors abort.
    pub async fn run(
        &self,
        state: &mut TraversalState,
        started_ms: u64,
    ) -> Result<(RunOutcome, RunStats), SweepError> {
        let mut stats = RunStats::default();

        let outcome = loop {
            let elapsed = self.clock.now_millis().saturating_sub(started_ms);
            if elapsed >= self.budget_ms {
                let work_remaining = !state.is_quiescent();
                info!(
                    elapsed_ms = elapsed,
                    budget_ms = self.budget_ms,
                    work_remaining,
                    "Time budget reached, suspending"
                );
                break RunOutcome::Suspended { work_remaining };
            }

            match self.step(state).await? {
                Some(step) => stats.record(&step),
                None => break RunOutcome::Complete,
            }
        };

        stats.elapsed_ms = self.clock.now_millis().saturating_sub(started_ms);
        Ok((outcome, stats))
    }

    /// Process one node and persist. `None` means both queues were empty.
    pub async fn step(&self, state: &mut TraversalState) -> Result<Option<StepOutcome>, SweepError> {
        let outcome = if let Some(file) = state.dequeue_file() {
            self.process_file(state, file).await
        } else if let Some(folder) = state.dequeue_folder() {
            self.process_folder(state, folder).await
        } else {
            return Ok(None);
        };

        checkpoint::save_state(self.store, state)?;
        debug!(
            folder_queue = state.folder_queue.len(),
            file_queue = state.file_queue.len(),
            "Checkpoint persisted"
        );
        Ok(Some(outcome))
    }

    async fn process_file(&self, state: &mut TraversalState, id: NodeId) -> StepOutcome {
        if state.is_file_processed(&id) {
            debug!(node_id = %id, "File already processed, skipping");
            return StepOutcome::Skipped {
                id,
                kind: NodeKind::File,
                reason: SkipReason::AlreadyProcessed,
            };
        }

        let outcome = match self.tree.node(&id).await {
            Ok(node) => {
                let report = reset_permissions(node.as_ref()).await;
                StepOutcome::Reset {
                    id: id.clone(),
                    report,
                }
            }
            Err(error) => node_failed(id.clone(), NodeKind::File, error),
        };
        state.mark_file_processed(id);
        outcome
    }

    async fn process_folder(&self, state: &mut TraversalState, id: NodeId) -> StepOutcome {
        if state.is_folder_processed(&id) {
            debug!(node_id = %id, "Folder already processed, skipping");
            return StepOutcome::Skipped {
                id,
                kind: NodeKind::Folder,
                reason: SkipReason::AlreadyProcessed,
            };
        }

        let outcome = match self.expand(&id).await {
            Ok((node, files, folders)) => {
                let (file_count, folder_count) = (files.len(), folders.len());
                state.enqueue_files(files);
                state.enqueue_folders(folders);
                let report = reset_permissions(node.as_ref()).await;
                debug!(
                    node_id = %id,
                    files = file_count,
                    folders = folder_count,
                    "Folder expanded"
                );
                StepOutcome::Expanded {
                    id: id.clone(),
                    folders: folder_count,
                    files: file_count,
                    report,
                }
            }
            Err(error) => node_failed(id.clone(), NodeKind::Folder, error),
        };
        state.mark_folder_processed(id);
        outcome
    }

    /// All listings happen before anything is enqueued, so a failure leaves
    /// the queues untouched.
    async fn expand(
        &self,
        id: &NodeId,
    ) -> Result<(Box<dyn SharedNode>, Vec<NodeId>, Vec<NodeId>), NodeError> {
        let node = self.tree.node(id).await?;
        let files = self.tree.child_files(id).await?;
        let folders = self.tree.child_folders(id).await?;
        Ok((node, files, folders))
    }
}

fn node_failed(id: NodeId, kind: NodeKind, error: NodeError) -> StepOutcome {
    warn!(
        node_id = %id,
        kind = ?kind,
        error_kind = error.kind(),
        error = %error,
        "Node unavailable, marking processed"
    );
    StepOutcome::Failed { id, kind, error }
}
