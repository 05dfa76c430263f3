//! Config loading facade: assembles the layered sources into `GrantSweepConfig`.

use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::merge::merge_policy;
use crate::config::sources::global_file;
use crate::config::GrantSweepConfig;
use crate::error::SweepError;

const ENV_PREFIX: &str = "GRANT_SWEEP";
const ENV_SEPARATOR: &str = "__";
const WORKSPACE_ENV_VAR: &str = "GRANT_SWEEP_ENV";
const DEFAULT_WORKSPACE_ENV: &str = "development";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, global file, workspace files and environment, in that order.
    pub fn load(workspace_root: &Path) -> Result<GrantSweepConfig, SweepError> {
        let builder = merge_policy::builder_with_defaults()?;
        let mut builder = global_file::add_to_builder(builder)?;
        for path in Self::workspace_files(workspace_root) {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config = builder.add_source(Self::environment()).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Workspace files that exist, lowest precedence first:
    /// `config/config.toml`, then `config/{GRANT_SWEEP_ENV}.toml`.
    pub fn workspace_files(workspace_root: &Path) -> Vec<PathBuf> {
        let config_dir = workspace_root.join("config");
        let env_name = std::env::var(WORKSPACE_ENV_VAR)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WORKSPACE_ENV.to_string());

        let candidates = [
            config_dir.join("config.toml"),
            config_dir.join(format!("{}.toml", env_name)),
        ];
        candidates
            .into_iter()
            .filter(|path| {
                let found = path.is_file();
                debug!(
                    config_path = %path.display(),
                    found,
                    env = %env_name,
                    "Workspace config source"
                );
                found
            })
            .collect()
    }

    /// Load a single explicit file (plus defaults and environment).
    pub fn load_from_file(path: &Path) -> Result<GrantSweepConfig, SweepError> {
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(Self::environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }
}
