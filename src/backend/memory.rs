//! In-memory storage tree
//!
//! Holds folders, files and their grants in a `DriveSnapshot` that can be
//! loaded from and written back to a JSON file. Used for offline runs and as
//! the test double for the engine (failure injection, call counters).

use crate::backend::{DriveTree, SharedNode};
use crate::error::{NodeError, StorageError, SweepError};
use crate::types::{AccessLevel, Audience, Grantee, NodeId, NodeKind};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Serializable tree with sharing state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveSnapshot {
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, SnapshotNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub owner: Option<String>,
    /// Files and folders directly contained, in listing order
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub public: BTreeMap<Audience, AccessLevel>,
    #[serde(default)]
    pub editors: Vec<String>,
    #[serde(default)]
    pub viewers: Vec<String>,
}

impl SnapshotNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            owner: None,
            children: Vec::new(),
            public: BTreeMap::new(),
            editors: Vec::new(),
            viewers: Vec::new(),
        }
    }

    /// No public access and no explicit grants left
    pub fn is_locked_down(&self) -> bool {
        self.public.values().all(|level| *level == AccessLevel::None)
            && self.editors.iter().all(|e| e.is_empty())
            && self.viewers.iter().all(|v| v.is_empty())
    }
}

/// Operations that can be made to fail for a given node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailPoint {
    Lookup,
    ListChildren,
    PublicAccess,
    ListEditors,
    ListViewers,
    RevokeEditor,
    RevokeViewer,
}

#[derive(Debug, Default)]
struct DriveInner {
    snapshot: DriveSnapshot,
    failures: BTreeSet<(NodeId, FailPoint)>,
    access_calls: BTreeMap<NodeId, usize>,
    expansions: BTreeMap<NodeId, usize>,
}

impl DriveInner {
    fn check(&self, id: &NodeId, point: FailPoint) -> Result<(), NodeError> {
        if self.failures.contains(&(id.clone(), point)) {
            return Err(NodeError::Backend {
                id: id.clone(),
                reason: format!("injected failure at {:?}", point),
            });
        }
        Ok(())
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut SnapshotNode, NodeError> {
        self.snapshot
            .nodes
            .get_mut(id)
            .ok_or_else(|| NodeError::NotFound(id.clone()))
    }

    fn children_of_kind(&mut self, folder: &NodeId, kind: NodeKind) -> Result<Vec<NodeId>, NodeError> {
        self.check(folder, FailPoint::ListChildren)?;
        let node = self
            .snapshot
            .nodes
            .get(folder)
            .ok_or_else(|| NodeError::NotFound(folder.clone()))?;
        let children = node
            .children
            .iter()
            .filter(|child| {
                self.snapshot
                    .nodes
                    .get(*child)
                    .map(|n| n.kind == kind)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        Ok(children)
    }
}

/// Shared handle to an in-memory tree; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDrive {
    inner: Arc<RwLock<DriveInner>>,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DriveSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(DriveInner {
                snapshot,
                ..DriveInner::default()
            })),
        }
    }

    pub fn load_snapshot_file(path: &Path) -> Result<Self, SweepError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SweepError::BackendError(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;
        let snapshot: DriveSnapshot = serde_json::from_str(&raw).map_err(|e| {
            SweepError::BackendError(format!("Invalid snapshot {}: {}", path.display(), e))
        })?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save_snapshot_file(&self, path: &Path) -> Result<(), SweepError> {
        let body = serde_json::to_string_pretty(&self.snapshot()).map_err(|e| {
            StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        std::fs::write(path, body).map_err(|e| StorageError::IoError(e).into())
    }

    pub fn snapshot(&self) -> DriveSnapshot {
        self.inner.read().snapshot.clone()
    }

    /// Add a folder; `parent = None` creates a root.
    pub fn add_folder(&self, parent: Option<&str>, id: &str) -> &Self {
        self.insert(parent, id, NodeKind::Folder)
    }

    pub fn add_file(&self, parent: &str, id: &str) -> &Self {
        self.insert(Some(parent), id, NodeKind::File)
    }

    fn insert(&self, parent: Option<&str>, id: &str, kind: NodeKind) -> &Self {
        let mut inner = self.inner.write();
        let id = NodeId::from(id);
        inner
            .snapshot
            .nodes
            .insert(id.clone(), SnapshotNode::new(kind));
        if let Some(parent) = parent {
            let parent = NodeId::from(parent);
            inner
                .snapshot
                .nodes
                .entry(parent)
                .or_insert_with(|| SnapshotNode::new(NodeKind::Folder))
                .children
                .push(id);
        }
        drop(inner);
        self
    }

    /// Delete a node while leaving it listed by its parent (deleted mid-run)
    pub fn remove_node(&self, id: &str) {
        self.inner.write().snapshot.nodes.remove(&NodeId::from(id));
    }

    pub fn set_owner(&self, id: &str, email: &str) -> &Self {
        self.with_node(id, |node| node.owner = Some(email.to_string()));
        self
    }

    pub fn grant_editor(&self, id: &str, email: &str) -> &Self {
        self.with_node(id, |node| node.editors.push(email.to_string()));
        self
    }

    pub fn grant_viewer(&self, id: &str, email: &str) -> &Self {
        self.with_node(id, |node| node.viewers.push(email.to_string()));
        self
    }

    pub fn share_publicly(&self, id: &str, audience: Audience, level: AccessLevel) -> &Self {
        self.with_node(id, |node| {
            node.public.insert(audience, level);
        });
        self
    }

    pub fn fail(&self, id: &str, point: FailPoint) -> &Self {
        self.inner.write().failures.insert((NodeId::from(id), point));
        self
    }

    pub fn node_state(&self, id: &str) -> Option<SnapshotNode> {
        self.inner.read().snapshot.nodes.get(&NodeId::from(id)).cloned()
    }

    /// Number of `set_public_access` calls made against a node
    pub fn access_calls(&self, id: &str) -> usize {
        self.inner
            .read()
            .access_calls
            .get(&NodeId::from(id))
            .copied()
            .unwrap_or(0)
    }

    /// Number of times a folder's children were listed
    pub fn expansions(&self, id: &str) -> usize {
        self.inner
            .read()
            .expansions
            .get(&NodeId::from(id))
            .copied()
            .unwrap_or(0)
    }

    pub fn ids_of_kind(&self, kind: NodeKind) -> BTreeSet<NodeId> {
        self.inner
            .read()
            .snapshot
            .nodes
            .iter()
            .filter(|(_, node)| node.kind == kind)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn with_node<F: FnOnce(&mut SnapshotNode)>(&self, id: &str, f: F) {
        let mut inner = self.inner.write();
        if let Some(node) = inner.snapshot.nodes.get_mut(&NodeId::from(id)) {
            f(node);
        }
    }
}

#[async_trait]
impl DriveTree for InMemoryDrive {
    async fn child_folders(&self, folder: &NodeId) -> Result<Vec<NodeId>, NodeError> {
        let mut inner = self.inner.write();
        let folders = inner.children_of_kind(folder, NodeKind::Folder)?;
        *inner.expansions.entry(folder.clone()).or_insert(0) += 1;
        Ok(folders)
    }

    async fn child_files(&self, folder: &NodeId) -> Result<Vec<NodeId>, NodeError> {
        self.inner.write().children_of_kind(folder, NodeKind::File)
    }

    async fn node(&self, id: &NodeId) -> Result<Box<dyn SharedNode>, NodeError> {
        let inner = self.inner.read();
        inner.check(id, FailPoint::Lookup)?;
        let node = inner
            .snapshot
            .nodes
            .get(id)
            .ok_or_else(|| NodeError::NotFound(id.clone()))?;
        Ok(Box::new(MemoryNode {
            id: id.clone(),
            kind: node.kind,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemoryNode {
    id: NodeId,
    kind: NodeKind,
    inner: Arc<RwLock<DriveInner>>,
}

#[async_trait]
impl SharedNode for MemoryNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    async fn set_public_access(
        &self,
        audience: Audience,
        level: AccessLevel,
    ) -> Result<(), NodeError> {
        let mut inner = self.inner.write();
        *inner.access_calls.entry(self.id.clone()).or_insert(0) += 1;
        inner.check(&self.id, FailPoint::PublicAccess)?;
        let node = inner.node_mut(&self.id)?;
        node.public.insert(audience, level);
        Ok(())
    }

    async fn editors(&self) -> Result<Vec<Grantee>, NodeError> {
        let mut inner = self.inner.write();
        inner.check(&self.id, FailPoint::ListEditors)?;
        let node = inner.node_mut(&self.id)?;
        Ok(node.editors.iter().map(Grantee::new).collect())
    }

    async fn viewers(&self) -> Result<Vec<Grantee>, NodeError> {
        let mut inner = self.inner.write();
        inner.check(&self.id, FailPoint::ListViewers)?;
        let node = inner.node_mut(&self.id)?;
        Ok(node.viewers.iter().map(Grantee::new).collect())
    }

    async fn revoke_editor(&self, email: &str) -> Result<(), NodeError> {
        let mut inner = self.inner.write();
        inner.check(&self.id, FailPoint::RevokeEditor)?;
        let node = inner.node_mut(&self.id)?;
        node.editors.retain(|e| e.as_str() != email);
        Ok(())
    }

    async fn revoke_viewer(&self, email: &str) -> Result<(), NodeError> {
        let mut inner = self.inner.write();
        inner.check(&self.id, FailPoint::RevokeViewer)?;
        let node = inner.node_mut(&self.id)?;
        node.viewers.retain(|v| v.as_str() != email);
        Ok(())
    }
}
