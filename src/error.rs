//! Error types for the grant sweep engine.

use crate::types::NodeId;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A node could not be read or mutated.
///
/// Caught at the node-processing level: the node is marked processed and the
/// traversal moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Access denied to node {id}: {reason}")]
    AccessDenied { id: NodeId, reason: String },

    #[error("Backend error on node {id}: {reason}")]
    Backend { id: NodeId, reason: String },
}

impl NodeError {
    pub fn node_id(&self) -> &NodeId {
        match self {
            NodeError::NotFound(id) => id,
            NodeError::AccessDenied { id, .. } => id,
            NodeError::Backend { id, .. } => id,
        }
    }

    /// Short classification used in structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::NotFound(_) => "not_found",
            NodeError::AccessDenied { .. } => "access_denied",
            NodeError::Backend { .. } => "backend",
        }
    }
}

/// Top-level errors surfaced by the entry points
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Checkpoint corrupt at key '{key}': {reason}. Run `grant-sweep reset` to discard it.")]
    CheckpointCorrupt { key: String, reason: String },

    #[error("Run in progress is for root '{persisted}' but configured root is '{configured}'")]
    RootMismatch { persisted: NodeId, configured: NodeId },

    #[error("No root folder configured (set sweep.root_id or pass --root)")]
    MissingRoot,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Trigger error: {0}")]
    TriggerError(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

impl From<config::ConfigError> for SweepError {
    fn from(err: config::ConfigError) -> Self {
        SweepError::ConfigError(err.to_string())
    }
}
