// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod errors;
pub mod lock;
pub mod logging;
pub mod proc;

use std::path::Path;

use tokio::time::sleep;
use tracing::info;

use crate::cli::{CliArgs, CliCommand};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::proc::supervisor::{
    self, server_state, start_server, start_tool, stop_server, stop_tool,
};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, then dispatches the selected subcommand. All managed-
/// process operations are unsynchronized across invocations; only `build`
/// is serialized (via the lock file).
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    match args.command {
        CliCommand::Start => start_all(&cfg).await,
        CliCommand::Stop => stop_all(&cfg),
        CliCommand::Restart => {
            stop_all(&cfg)?;
            info!(
                delay_ms = cfg.server.settle_delay_ms,
                "waiting for processes to settle before restart"
            );
            sleep(cfg.server.settle_delay()).await;
            start_all(&cfg).await
        }
        CliCommand::Status => {
            print_status(&cfg);
            Ok(())
        }
        CliCommand::Build => build::run_build(&cfg.build).await,
    }
}

/// Start the server, then every configured tool, in config order.
async fn start_all(cfg: &ConfigFile) -> Result<()> {
    start_server(&cfg.server).await?;

    let settle = cfg.server.settle_delay();
    let log_dir = Path::new(&cfg.server.log_dir);
    for (name, tool) in cfg.tool.iter() {
        start_tool(name, tool, settle, log_dir).await?;
    }
    Ok(())
}

/// Stop the server, then every configured tool. Already-stopped targets are
/// no-ops.
fn stop_all(cfg: &ConfigFile) -> Result<()> {
    stop_server(&cfg.server)?;
    for (name, tool) in cfg.tool.iter() {
        stop_tool(name, tool)?;
    }
    Ok(())
}

/// Plain status report, one line per managed process.
fn print_status(cfg: &ConfigFile) {
    println!("stackctl status");
    println!(
        "  server ({} {}): {}",
        cfg.server.interpreter,
        cfg.server.entry,
        server_state(&cfg.server)
    );
    for (name, tool) in cfg.tool.iter() {
        println!(
            "  tool {name} (port {}): {}",
            tool.port,
            supervisor::tool_state(tool)
        );
    }
}
