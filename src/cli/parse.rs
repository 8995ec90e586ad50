//! CLI parse: clap types for margin. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// margin - model-written commentary for source files, cached per workspace
#[derive(Parser)]
#[command(name = "margin", version)]
#[command(about = "Annotate source files with cached, model-generated commentary")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory (the root is the nearest ancestor with .git or .margin)
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a greeting
    Hello,
    /// Show provider, store location and cache statistics
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print a file's raw contents with line numbers
    Show {
        file: PathBuf,
    },
    /// Generate (or reuse cached) commentary and show it beside the source
    Annotate {
        file: PathBuf,
        /// Abstraction level, 1 (overview) to 5 (line by line)
        #[arg(long, default_value_t = 5)]
        level: u8,
        /// Regenerate even when a fresh cached entry exists
        #[arg(long)]
        force: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Switch the displayed abstraction level for a file
    Level {
        file: PathBuf,
        /// Abstraction level, 1 to 5
        level: u8,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Inspect and maintain the commentary cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Re-annotate a file whenever it changes
    Watch {
        file: PathBuf,
        /// Abstraction level, 1 to 5
        #[arg(long, default_value_t = 5)]
        level: u8,
        /// Quiet period in milliseconds (defaults to watch.debounce_ms)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cached files, most recently updated first
    List {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show cache statistics
    Stats {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Remove cached commentary for a file (one level or all)
    Remove {
        file: PathBuf,
        #[arg(long)]
        level: Option<u8>,
    },
    /// Remove every cached entry
    Clear,
    /// Remove entries for files that no longer exist
    Prune,
}
