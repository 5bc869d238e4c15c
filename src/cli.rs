// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `stackctl`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stackctl",
    version,
    about = "Start, stop and build the application server and its helper tools.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to the config file (TOML).
    ///
    /// Default: `Stackctl.toml` in the current working directory.
    #[arg(
        long,
        value_name = "PATH",
        default_value = "Stackctl.toml",
        global = true
    )]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STACKCTL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

/// The single subcommand selector.
#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Start the application server and all configured helper tools.
    Start,
    /// Stop the application server and all configured helper tools.
    ///
    /// Stopping something that is already stopped is a no-op, not an error.
    Stop,
    /// Stop, wait the settle delay, then start again. Not atomic: a
    /// concurrent `status` may observe the stopped window in between.
    Restart,
    /// Report running/stopped per managed process. Side-effect free.
    Status,
    /// Run the build pipeline (serialized via the build lock file).
    Build,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommand_and_defaults() {
        let args = CliArgs::parse_from(["stackctl", "status"]);
        assert!(matches!(args.command, CliCommand::Status));
        assert_eq!(args.config, "Stackctl.toml");
        assert!(args.log_level.is_none());
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let args =
            CliArgs::parse_from(["stackctl", "build", "--config", "ops/Stackctl.toml"]);
        assert!(matches!(args.command, CliCommand::Build));
        assert_eq!(args.config, "ops/Stackctl.toml");
    }
}
