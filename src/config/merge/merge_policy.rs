//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

use crate::config::{
    default_store_path, DEFAULT_ENTRY_POINT, DEFAULT_RESUME_DELAY_SECS, DEFAULT_TIME_BUDGET_SECS,
    DEFAULT_TOKEN_ENV,
};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("sweep.time_budget_secs", DEFAULT_TIME_BUDGET_SECS)?
        .set_default("sweep.resume_delay_secs", DEFAULT_RESUME_DELAY_SECS)?
        .set_default("sweep.entry_point", DEFAULT_ENTRY_POINT)?
        .set_default(
            "storage.store_path",
            default_store_path().to_string_lossy().to_string(),
        )?
        .set_default("backend.kind", "drive")?
        .set_default("backend.token_env", DEFAULT_TOKEN_ENV)
}
