//! Storage backend seams
//!
//! The engine only talks to the tree and to individual nodes through these
//! traits. Adapters: an in-memory tree (tests, JSON snapshots) and a REST
//! client for a Drive v3 style API.

pub mod drive_rest;
pub mod memory;

pub use drive_rest::DriveRestClient;
pub use memory::{DriveSnapshot, FailPoint, InMemoryDrive, SnapshotNode};

use crate::error::NodeError;
use crate::types::{AccessLevel, Audience, Grantee, NodeId, NodeKind};
use async_trait::async_trait;

/// Sharing operations available on both files and folders
#[async_trait]
pub trait SharedNode: Send + Sync {
    fn id(&self) -> &NodeId;

    fn kind(&self) -> NodeKind;

    async fn set_public_access(
        &self,
        audience: Audience,
        level: AccessLevel,
    ) -> Result<(), NodeError>;

    async fn editors(&self) -> Result<Vec<Grantee>, NodeError>;

    async fn viewers(&self) -> Result<Vec<Grantee>, NodeError>;

    async fn revoke_editor(&self, email: &str) -> Result<(), NodeError>;

    async fn revoke_viewer(&self, email: &str) -> Result<(), NodeError>;
}

/// Containment queries over the storage tree
#[async_trait]
pub trait DriveTree: Send + Sync {
    /// Direct subfolders, in backend listing order
    async fn child_folders(&self, folder: &NodeId) -> Result<Vec<NodeId>, NodeError>;

    /// Direct files, in backend listing order
    async fn child_files(&self, folder: &NodeId) -> Result<Vec<NodeId>, NodeError>;

    /// Resolve a node handle; `NodeError::NotFound` if it no longer exists
    async fn node(&self, id: &NodeId) -> Result<Box<dyn SharedNode>, NodeError>;
}
