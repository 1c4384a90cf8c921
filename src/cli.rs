// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `shellsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "shellsched",
    version,
    about = "Run shell commands concurrently, respecting their dependencies.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Shellsched.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Shellsched.toml")]
    pub config: String,

    /// Number of concurrent workers; overrides `[config].workers`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SHELLSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the tasks, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
