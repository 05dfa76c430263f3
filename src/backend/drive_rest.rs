//! REST adapter for a Drive v3 style API
//!
//! Children are listed through `files.list` filtered by parent, sharing goes
//! through the `permissions` collection of each file. Owner grants are never
//! touched.

use crate::backend::{DriveTree, SharedNode};
use crate::error::{NodeError, SweepError};
use crate::types::{AccessLevel, Audience, Grantee, NodeId, NodeKind};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DRIVE_ENDPOINT: &str = "https://www.googleapis.com/drive/v3";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const PAGE_SIZE: &str = "1000";
const PERMISSION_PAGE_SIZE: &str = "100";
const PERMISSION_FIELDS: &str =
    "nextPageToken,permissions(id,type,role,emailAddress,allowFileDiscovery)";
const DRIVE_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const EDITOR_ROLES: [&str; 3] = ["writer", "fileOrganizer", "organizer"];
const VIEWER_ROLES: [&str; 2] = ["reader", "commenter"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    id: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionList {
    next_page_token: Option<String>,
    #[serde(default)]
    permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Permission {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    role: String,
    #[serde(default)]
    email_address: Option<String>,
    #[serde(default)]
    allow_file_discovery: Option<bool>,
}

impl Permission {
    fn is_public_for(&self, audience: Audience) -> bool {
        if self.kind != "anyone" {
            return false;
        }
        let discoverable = self.allow_file_discovery.unwrap_or(false);
        match audience {
            Audience::Anyone => discoverable,
            Audience::AnyoneWithLink => !discoverable,
        }
    }

    fn grantee_with_role(&self, roles: &[&str]) -> Option<&str> {
        if self.kind != "user" && self.kind != "group" {
            return None;
        }
        if !roles.contains(&self.role.as_str()) {
            return None;
        }
        self.email_address.as_deref().filter(|e| !e.is_empty())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPublicPermission {
    #[serde(rename = "type")]
    kind: &'static str,
    role: &'static str,
    allow_file_discovery: bool,
}

struct DriveHttp {
    client: Client,
    base: Url,
    token: String,
}

impl DriveHttp {
    /// Appends percent-encoded path segments to the base endpoint.
    fn url(&self, id: &NodeId, segments: &[&str]) -> Result<Url, NodeError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| NodeError::Backend {
                id: id.clone(),
                reason: format!("Endpoint cannot carry a path: {}", self.base),
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.token))
            .query(&[("supportsAllDrives", "true")])
    }

    async fn send(&self, id: &NodeId, builder: RequestBuilder) -> Result<Response, NodeError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| map_http_error(id, e))?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(map_status(id, status, body))
    }

    async fn list_children(
        &self,
        folder: &NodeId,
        folders: bool,
    ) -> Result<Vec<NodeId>, NodeError> {
        let operator = if folders { "=" } else { "!=" };
        let query = format!(
            "'{}' in parents and mimeType {} '{}' and trashed = false",
            folder.as_str().replace('\'', "\\'"),
            operator,
            FOLDER_MIME_TYPE
        );
        let url = self.url(folder, &["files"])?;

        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(url.clone()).query(&[
                ("q", query.as_str()),
                ("fields", "nextPageToken,files(id)"),
                ("pageSize", PAGE_SIZE),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: FileList = self
                .send(folder, request)
                .await?
                .json()
                .await
                .map_err(|e| map_http_error(folder, e))?;
            out.extend(page.files.into_iter().map(|f| NodeId::from(f.id)));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        debug!(folder = %folder, count = out.len(), folders, "Listed children");
        Ok(out)
    }

    /// Every permission on the node, following `nextPageToken` to the end.
    async fn permissions(&self, id: &NodeId) -> Result<Vec<Permission>, NodeError> {
        let url = self.url(id, &["files", id.as_str(), "permissions"])?;

        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(url.clone()).query(&[
                ("fields", PERMISSION_FIELDS),
                ("pageSize", PERMISSION_PAGE_SIZE),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: PermissionList = self
                .send(id, request)
                .await?
                .json()
                .await
                .map_err(|e| map_http_error(id, e))?;
            out.extend(page.permissions);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(out)
    }

    async fn delete_permission(&self, id: &NodeId, permission_id: &str) -> Result<(), NodeError> {
        let url = self.url(id, &["files", id.as_str(), "permissions", permission_id])?;
        self.send(id, self.client.delete(url)).await?;
        Ok(())
    }

    async fn revoke_with_roles(
        &self,
        id: &NodeId,
        email: &str,
        roles: &[&str],
    ) -> Result<(), NodeError> {
        let matching: Vec<Permission> = self
            .permissions(id)
            .await?
            .into_iter()
            .filter(|p| {
                p.grantee_with_role(roles)
                    .map(|e| e.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
            })
            .collect();
        for permission in matching {
            self.delete_permission(id, &permission.id).await?;
        }
        Ok(())
    }

    async fn grantees(&self, id: &NodeId, roles: &[&str]) -> Result<Vec<Grantee>, NodeError> {
        Ok(self
            .permissions(id)
            .await?
            .iter()
            .filter_map(|p| p.grantee_with_role(roles))
            .map(Grantee::new)
            .collect())
    }
}

/// Drive v3 client authenticated with a bearer token
#[derive(Clone)]
pub struct DriveRestClient {
    http: Arc<DriveHttp>,
}

impl DriveRestClient {
    pub fn new(
        endpoint: Option<String>,
        token: String,
        request_timeout: Duration,
    ) -> Result<Self, SweepError> {
        let client = Client::builder()
            .connect_timeout(DRIVE_HTTP_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| SweepError::BackendError(format!("Failed to create HTTP client: {}", e)))?;
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_DRIVE_ENDPOINT.to_string());
        let base = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| SweepError::BackendError(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
        if base.cannot_be_a_base() {
            return Err(SweepError::BackendError(format!(
                "Endpoint is not a base URL: {}",
                endpoint
            )));
        }
        Ok(Self {
            http: Arc::new(DriveHttp {
                client,
                base,
                token,
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.http.base.as_str()
    }
}

#[async_trait]
impl DriveTree for DriveRestClient {
    async fn child_folders(&self, folder: &NodeId) -> Result<Vec<NodeId>, NodeError> {
        self.http.list_children(folder, true).await
    }

    async fn child_files(&self, folder: &NodeId) -> Result<Vec<NodeId>, NodeError> {
        self.http.list_children(folder, false).await
    }

    async fn node(&self, id: &NodeId) -> Result<Box<dyn SharedNode>, NodeError> {
        let url = self.http.url(id, &["files", id.as_str()])?;
        let request = self.http.client.get(url).query(&[("fields", "id,mimeType")]);
        let entry: FileEntry = self
            .http
            .send(id, request)
            .await?
            .json()
            .await
            .map_err(|e| map_http_error(id, e))?;
        let kind = match entry.mime_type.as_deref() {
            Some(FOLDER_MIME_TYPE) => NodeKind::Folder,
            _ => NodeKind::File,
        };
        Ok(Box::new(DriveNode {
            id: NodeId::from(entry.id),
            kind,
            http: Arc::clone(&self.http),
        }))
    }
}

struct DriveNode {
    id: NodeId,
    kind: NodeKind,
    http: Arc<DriveHttp>,
}

#[async_trait]
impl SharedNode for DriveNode {
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
        let existing: Vec<Permission> = self
            .http
            .permissions(&self.id)
            .await?
            .into_iter()
            .filter(|p| p.is_public_for(audience))
            .collect();
        for permission in existing {
            self.http.delete_permission(&self.id, &permission.id).await?;
        }

        let role = match level {
            AccessLevel::None => return Ok(()),
            AccessLevel::View => "reader",
            AccessLevel::Comment => "commenter",
            AccessLevel::Edit => "writer",
        };
        let url = self
            .http
            .url(&self.id, &["files", self.id.as_str(), "permissions"])?;
        let body = NewPublicPermission {
            kind: "anyone",
            role,
            allow_file_discovery: audience == Audience::Anyone,
        };
        self.http
            .send(&self.id, self.http.client.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn editors(&self) -> Result<Vec<Grantee>, NodeError> {
        self.http.grantees(&self.id, &EDITOR_ROLES).await
    }

    async fn viewers(&self) -> Result<Vec<Grantee>, NodeError> {
        self.http.grantees(&self.id, &VIEWER_ROLES).await
    }

    async fn revoke_editor(&self, email: &str) -> Result<(), NodeError> {
        self.http.revoke_with_roles(&self.id, email, &EDITOR_ROLES).await
    }

    async fn revoke_viewer(&self, email: &str) -> Result<(), NodeError> {
        self.http.revoke_with_roles(&self.id, email, &VIEWER_ROLES).await
    }
}

fn map_status(id: &NodeId, status: u16, body: String) -> NodeError {
    match status {
        404 => NodeError::NotFound(id.clone()),
        401 | 403 => NodeError::AccessDenied {
            id: id.clone(),
            reason: format!("HTTP {}: {}", status, body),
        },
        _ => NodeError::Backend {
            id: id.clone(),
            reason: format!("HTTP {}: {}", status, body),
        },
    }
}

fn map_http_error(id: &NodeId, error: reqwest::Error) -> NodeError {
    if let Some(status) = error.status() {
        return map_status(id, status.as_u16(), error.to_string());
    }
    let reason = if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection error: {}", error)
    } else {
        format!("HTTP error: {}", error)
    };
    NodeError::Backend {
        id: id.clone(),
        reason,
    }
}
