// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::ConfigFile;
use crate::errors::{Result, StackctlError};

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - `server.interpreter` and `server.entry` are non-empty
/// - `server.settle_delay_ms >= 1`
/// - every `[tool.<name>]` has a non-zero port and a non-empty command
/// - tool ports are unique
/// - build paths are non-empty and `frontend_dist != deploy_dir`
/// - `pin_package` / `pin_version` are set together or not at all
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_server(cfg)?;
    validate_tools(cfg)?;
    validate_build(cfg)?;
    Ok(())
}

fn validate_server(cfg: &ConfigFile) -> Result<()> {
    if cfg.server.interpreter.trim().is_empty() {
        return Err(config_error("[server].interpreter must be non-empty"));
    }
    if cfg.server.entry.trim().is_empty() {
        return Err(config_error(
            "[server].entry must be set (entry-point script path)",
        ));
    }
    if cfg.server.settle_delay_ms == 0 {
        return Err(config_error(
            "[server].settle_delay_ms must be >= 1 (got 0)",
        ));
    }
    Ok(())
}

fn validate_tools(cfg: &ConfigFile) -> Result<()> {
    let mut seen_ports: BTreeMap<u16, &str> = BTreeMap::new();

    for (name, tool) in cfg.tool.iter() {
        if tool.port == 0 {
            return Err(config_error(&format!(
                "tool '{}' must declare a non-zero port",
                name
            )));
        }
        if tool.cmd.trim().is_empty() {
            return Err(config_error(&format!(
                "tool '{}' must declare a launch command in `cmd`",
                name
            )));
        }
        if let Some(other) = seen_ports.insert(tool.port, name.as_str()) {
            return Err(config_error(&format!(
                "tools '{}' and '{}' both use port {}",
                other, name, tool.port
            )));
        }
    }
    Ok(())
}

fn validate_build(cfg: &ConfigFile) -> Result<()> {
    let build = &cfg.build;

    if build.lock_file.trim().is_empty() {
        return Err(config_error("[build].lock_file must be non-empty"));
    }
    if build.frontend_dist.trim().is_empty() || build.deploy_dir.trim().is_empty() {
        return Err(config_error(
            "[build].frontend_dist and [build].deploy_dir must be non-empty",
        ));
    }
    if build.frontend_dist == build.deploy_dir {
        return Err(config_error(
            "[build].frontend_dist and [build].deploy_dir must differ \
             (the deploy dir is removed and replaced by the dist dir)",
        ));
    }
    if build.pin_package.is_some() != build.pin_version.is_some() {
        return Err(config_error(
            "[build].pin_package and [build].pin_version must be set together",
        ));
    }
    Ok(())
}

fn config_error(msg: &str) -> StackctlError {
    StackctlError::ConfigError(msg.to_string())
}
