//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::SweepError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &SweepError) -> String {
    match e {
        SweepError::CheckpointCorrupt { .. } => format!(
            "{}\nPartial progress was left untouched.",
            e
        ),
        SweepError::RootMismatch { .. } => format!(
            "{}\nFinish or `grant-sweep reset` the current sweep before changing the root.",
            e
        ),
        _ => e.to_string(),
    }
}

/// Process exit code for an error category.
pub fn exit_code(e: &SweepError) -> i32 {
    match e {
        SweepError::ConfigError(_) | SweepError::MissingRoot => 2,
        SweepError::CheckpointCorrupt { .. } | SweepError::RootMismatch { .. } => 3,
        _ => 1,
    }
}
