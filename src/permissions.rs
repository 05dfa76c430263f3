//! Permission Reset Operation
//!
//! Strips public link access and every explicit editor/viewer grant from one
//! node. Each sub-step is attempted regardless of the others failing, and the
//! end state is the same no matter how many times the reset runs.

use crate::backend::SharedNode;
use crate::error::NodeError;
use crate::types::{AccessLevel, Audience};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Which sub-step of a reset failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "target", rename_all = "snake_case")]
pub enum PermissionStep {
    PublicAccess(Audience),
    ListEditors,
    RevokeEditor(String),
    ListViewers,
    RevokeViewer(String),
}

impl fmt::Display for PermissionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStep::PublicAccess(audience) => {
                write!(f, "close public access ({})", audience.as_str())
            }
            PermissionStep::ListEditors => f.write_str("list editors"),
            PermissionStep::RevokeEditor(email) => write!(f, "revoke editor {}", email),
            PermissionStep::ListViewers => f.write_str("list viewers"),
            PermissionStep::RevokeViewer(email) => write!(f, "revoke viewer {}", email),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStepFailure {
    pub step: PermissionStep,
    pub error: NodeError,
}

/// What one reset did to one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub public_audiences_closed: usize,
    pub editors_revoked: usize,
    pub viewers_revoked: usize,
    pub failures: Vec<PermissionStepFailure>,
}

impl ResetReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Remove public sharing and explicit grants from `node`.
pub async fn reset_permissions(node: &dyn SharedNode) -> ResetReport {
    let mut report = ResetReport::default();

    for audience in Audience::ALL {
        match node.set_public_access(audience, AccessLevel::None).await {
            Ok(()) => report.public_audiences_closed += 1,
            Err(error) => record(&mut report, node, PermissionStep::PublicAccess(audience), error),
        }
    }

    match node.editors().await {
        Ok(editors) => {
            for editor in editors.into_iter().filter(|g| !g.email.is_empty()) {
                match node.revoke_editor(&editor.email).await {
                    Ok(()) => report.editors_revoked += 1,
                    Err(error) => record(
                        &mut report,
                        node,
                        PermissionStep::RevokeEditor(editor.email),
                        error,
                    ),
                }
            }
        }
        Err(error) => record(&mut report, node, PermissionStep::ListEditors, error),
    }

    match node.viewers().await {
        Ok(viewers) => {
            for viewer in viewers.into_iter().filter(|g| !g.email.is_empty()) {
                match node.revoke_viewer(&viewer.email).await {
                    Ok(()) => report.viewers_revoked += 1,
                    Err(error) => record(
                        &mut report,
                        node,
                        PermissionStep::RevokeViewer(viewer.email),
                        error,
                    ),
                }
            }
        }
        Err(error) => record(&mut report, node, PermissionStep::ListViewers, error),
    }

    debug!(
        node_id = %node.id(),
        editors_revoked = report.editors_revoked,
        viewers_revoked = report.viewers_revoked,
        failures = report.failures.len(),
        "Permissions reset"
    );
    report
}

fn record(report: &mut ResetReport, node: &dyn SharedNode, step: PermissionStep, error: NodeError) {
    warn!(
        node_id = %node.id(),
        step = %step,
        error_kind = error.kind(),
        error = %error,
        "Permission sub-operation failed"
    );
    report.failures.push(PermissionStepFailure { step, error });
}
