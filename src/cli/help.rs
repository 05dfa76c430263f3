//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string for log fields (e.g. "start", "status").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Start { .. } => "start",
        Commands::Run { .. } => "run",
        Commands::Reset { .. } => "reset",
        Commands::Status { .. } => "status",
        Commands::Triggers { .. } => "triggers",
        Commands::Config => "config",
    }
}

/// Whether the command mutates checkpoint or trigger state.
pub fn is_mutating(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Start { .. } | Commands::Run { .. } | Commands::Reset { .. }
    )
}
