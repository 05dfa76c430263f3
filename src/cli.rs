//! CLI domain: parse, route, help, output, and presentation only.
//! No sweep logic; a single route table dispatches to the engine.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands};
pub use route::RunContext;
