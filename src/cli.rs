// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `fleetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fleetdag",
    version,
    about = "Run deployment task graphs across a fleet of nodes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    ///
    /// Default: `Fleet.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Fleet.toml")]
    pub plan: String,

    /// Parse + validate, print the plan, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the task graph in Graphviz format to PATH (`-` for stdout).
    #[arg(long, value_name = "PATH")]
    pub dot: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLEETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
