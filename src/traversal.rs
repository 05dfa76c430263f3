//! Traversal Queue Manager
//!
//! Breadth-first work queues for folders and files plus the processed-sets
//! that make re-enqueued nodes harmless. The whole struct is the checkpoint:
//! persisting it after every step is what lets a run resume exactly where it
//! stopped.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Node id to "done" marker. Grows monotonically until cleanup.
pub type ProcessedSet = BTreeMap<NodeId, bool>;

/// In-progress traversal of one root folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalState {
    pub root_id: NodeId,
    pub folder_queue: VecDeque<NodeId>,
    pub file_queue: VecDeque<NodeId>,
    pub processed_folders: ProcessedSet,
    pub processed_files: ProcessedSet,
}

/// Counts reported by `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub folder_queue: usize,
    pub file_queue: usize,
    pub processed_folders: usize,
    pub processed_files: usize,
}

impl TraversalState {
    /// Fresh state: only the root is pending.
    pub fn initialize(root_id: NodeId) -> Self {
        let mut folder_queue = VecDeque::new();
        folder_queue.push_back(root_id.clone());
        Self {
            root_id,
            folder_queue,
            file_queue: VecDeque::new(),
            processed_folders: ProcessedSet::new(),
            processed_files: ProcessedSet::new(),
        }
    }

    pub fn dequeue_folder(&mut self) -> Option<NodeId> {
        self.folder_queue.pop_front()
    }

    pub fn dequeue_file(&mut self) -> Option<NodeId> {
        self.file_queue.pop_front()
    }

    pub fn enqueue_folders<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.folder_queue.extend(ids);
    }

    pub fn enqueue_files<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.file_queue.extend(ids);
    }

    pub fn mark_folder_processed(&mut self, id: NodeId) {
        self.processed_folders.insert(id, true);
    }

    pub fn mark_file_processed(&mut self, id: NodeId) {
        self.processed_files.insert(id, true);
    }

    pub fn is_folder_processed(&self, id: &NodeId) -> bool {
        self.processed_folders.get(id).copied().unwrap_or(false)
    }

    pub fn is_file_processed(&self, id: &NodeId) -> bool {
        self.processed_files.get(id).copied().unwrap_or(false)
    }

    /// Both queues empty: the traversal is complete.
    pub fn is_quiescent(&self) -> bool {
        self.folder_queue.is_empty() && self.file_queue.is_empty()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            folder_queue: self.folder_queue.len(),
            file_queue: self.file_queue.len(),
            processed_folders: self.processed_folders.len(),
            processed_files: self.processed_files.len(),
        }
    }
}
