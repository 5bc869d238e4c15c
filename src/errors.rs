// src/errors.rs

//! Crate-wide error types.
//!
//! Every failure here is terminal to the current invocation: there are no
//! retries anywhere in the tool, and the only guaranteed cleanup is the
//! build lock release (see `lock`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackctlError {
    #[error("{name} is already running (pids {pids:?}); stop it first")]
    AlreadyRunning { name: String, pids: Vec<u32> },

    #[error("{name} did not appear after the settle delay; check {log:?}")]
    SpawnFailed { name: String, log: PathBuf },

    #[error(
        "build lock at {path:?} is held by pid {owner}; \
         if that build is no longer running, delete the file manually"
    )]
    LockHeld { owner: String, path: PathBuf },

    #[error("required tool not found on PATH: {0}")]
    MissingTool(String),

    #[error("build step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StackctlError>;
