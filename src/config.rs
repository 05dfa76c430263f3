//! Configuration System
//!
//! Static, layered configuration: built-in defaults, the global
//! `~/.config/grant-sweep/config.toml`, workspace `config/*.toml`, then
//! `GRANT_SWEEP__*` environment variables. Read once per invocation.

use crate::error::SweepError;
use crate::logging::LoggingConfig;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
}

pub use facade::ConfigLoader;

/// Serializes tests that touch HOME, XDG_CONFIG_HOME or GRANT_SWEEP__* variables.
#[cfg(test)]
pub(crate) static TEST_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

pub const DEFAULT_TIME_BUDGET_SECS: u64 = 300;
pub const DEFAULT_RESUME_DELAY_SECS: u64 = 60;
pub const DEFAULT_ENTRY_POINT: &str = "start";
pub const DEFAULT_TOKEN_ENV: &str = "GRANT_SWEEP_DRIVE_TOKEN";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantSweepConfig {
    #[serde(default)]
    pub sweep: SweepSettings,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Traversal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Folder whose subtree is swept
    #[serde(default)]
    pub root_id: Option<String>,

    /// Wall-clock budget per invocation, kept below the host's hard limit
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Delay before a resume trigger fires
    #[serde(default = "default_resume_delay_secs")]
    pub resume_delay_secs: u64,

    /// Entry point name registered on resume triggers
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

fn default_time_budget_secs() -> u64 {
    DEFAULT_TIME_BUDGET_SECS
}

fn default_resume_delay_secs() -> u64 {
    DEFAULT_RESUME_DELAY_SECS
}

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            root_id: None,
            time_budget_secs: default_time_budget_secs(),
            resume_delay_secs: default_resume_delay_secs(),
            entry_point: default_entry_point(),
        }
    }
}

impl SweepSettings {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_secs(self.resume_delay_secs)
    }

    pub fn root(&self) -> Result<NodeId, SweepError> {
        match self.root_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(NodeId::from(id)),
            _ => Err(SweepError::MissingRoot),
        }
    }
}

/// Where checkpoint and trigger state live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

pub(crate) fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "grant-sweep")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from(".grant-sweep/store"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Drive v3 style REST API
    #[default]
    Drive,
    /// JSON snapshot file, rewritten after each invocation
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// REST endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            endpoint: None,
            token_env: default_token_env(),
            snapshot_path: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Sweep(String),
    Storage(String),
    Backend(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Sweep(msg) => write!(f, "Sweep: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Backend(msg) => write!(f, "Backend: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl GrantSweepConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(root) = &self.sweep.root_id {
            if root.trim().is_empty() {
                errors.push(ValidationError::Sweep("root_id cannot be empty".to_string()));
            }
        }
        if self.sweep.time_budget_secs == 0 {
            errors.push(ValidationError::Sweep(
                "time_budget_secs must be greater than zero".to_string(),
            ));
        }
        if self.sweep.entry_point.trim().is_empty() {
            errors.push(ValidationError::Sweep("entry_point cannot be empty".to_string()));
        }
        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("store_path cannot be empty".to_string()));
        }
        match self.backend.kind {
            BackendKind::Snapshot if self.backend.snapshot_path.is_none() => {
                errors.push(ValidationError::Backend(
                    "snapshot backend requires snapshot_path".to_string(),
                ));
            }
            BackendKind::Drive if self.backend.token_env.trim().is_empty() => {
                errors.push(ValidationError::Backend("token_env cannot be empty".to_string()));
            }
            _ => {}
        }
        if let Some(endpoint) = &self.backend.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ValidationError::Backend(format!(
                    "endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one `ConfigError`
    pub fn ensure_valid(&self) -> Result<(), SweepError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SweepError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
