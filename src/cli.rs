//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{CacheCommands, Cli, Commands};
pub use presentation::{format_file_list, format_stats, format_status, StatusReport};
pub use route::RunContext;
