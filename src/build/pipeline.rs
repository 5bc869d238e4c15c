// src/build/pipeline.rs

//! Lock-guarded build pipeline.
//!
//! An ordered, fail-fast sequence of external-tool invocations: verify the
//! required executables resolve, install backend dependencies, force-
//! reinstall one pinned package to settle a known transitive conflict, build
//! the frontend, then replace the deploy directory with the fresh output.
//! The first failing step aborts the rest; completed steps are not rolled
//! back, so partial build state may remain on disk. The lock is released on
//! every exit path.

use std::fs;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::model::BuildConfig;
use crate::errors::{Result, StackctlError};
use crate::lock::BuildLock;

/// Run the full build pipeline under the build lock.
pub async fn run_build(build: &BuildConfig) -> Result<()> {
    let lock = BuildLock::acquire(Path::new(&build.lock_file))?;
    let result = run_pipeline(build).await;
    lock.release();
    result
}

/// The pipeline itself, without lock handling. Exposed for tests.
pub async fn run_pipeline(build: &BuildConfig) -> Result<()> {
    check_required_tools(&build.required_tools)?;

    run_step(
        "backend install",
        &build.install_cmd,
        Path::new(&build.backend_dir),
        LineSeverity::Plain,
    )
    .await?;

    if let (Some(pkg), Some(ver)) = (&build.pin_package, &build.pin_version) {
        let cmd = format!("poetry run pip install --force-reinstall {pkg}=={ver}");
        run_step(
            "pin remediation",
            &cmd,
            Path::new(&build.backend_dir),
            LineSeverity::DemotePipResolverErrors,
        )
        .await?;
    }

    run_step(
        "frontend build",
        &build.frontend_cmd,
        Path::new(&build.frontend_dir),
        LineSeverity::Plain,
    )
    .await?;

    swap_artifacts(Path::new(&build.frontend_dist), Path::new(&build.deploy_dir))?;

    info!("build pipeline finished");
    Ok(())
}

/// Verify every required executable resolves on PATH.
///
/// Aborts on the first missing tool, naming it, before any destructive step.
pub fn check_required_tools(tools: &[String]) -> Result<()> {
    for tool in tools {
        if !tool_on_path(tool) {
            return Err(StackctlError::MissingTool(tool.clone()));
        }
        info!(tool = %tool, "required tool found");
    }
    Ok(())
}

/// Check if a command exists on PATH.
fn tool_on_path(tool: &str) -> bool {
    std::process::Command::new("which")
        .arg(tool)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// How to log a captured stderr line.
#[derive(Debug, Clone, Copy)]
enum LineSeverity {
    /// stderr at error level, stdout at info level.
    Plain,
    /// Like `Plain`, but pip's dependency-resolver complaint is demoted to
    /// warn level: the force-reinstall intentionally breaks one pin and the
    /// message is known benign, so it must not look fatal in the log.
    DemotePipResolverErrors,
}

/// Run one pipeline step via the shell, streaming its output into the log.
async fn run_step(
    step: &str,
    command: &str,
    workdir: &Path,
    severity: LineSeverity,
) -> Result<()> {
    info!(step, cmd = %command, workdir = ?workdir, "running build step");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    cmd.current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning build step '{step}'"))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let step_name = step.to_string();
    let stdout_task = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(step = %step_name, "{line}");
            }
        }
    });

    let step_name = step.to_string();
    let stderr_task = tokio::spawn(async move {
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match severity {
                    LineSeverity::DemotePipResolverErrors if pip_resolver_noise(&line) => {
                        warn!(step = %step_name, "{line}");
                    }
                    _ => error!(step = %step_name, "{line}"),
                }
            }
        }
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for build step '{step}'"))?;

    // Drain the readers before reporting so the log is complete.
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if status.success() {
        info!(step, "build step succeeded");
        Ok(())
    } else {
        Err(StackctlError::StepFailed {
            step: step.to_string(),
            code: status.code().unwrap_or(-1),
        })
    }
}

/// pip's dependency-resolver complaint emitted by the force-reinstall step.
fn pip_resolver_noise(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ERROR: pip's dependency resolver")
            .expect("hard-coded regex is valid")
    })
    .is_match(line)
}

/// Replace `deploy_dir` with `dist_dir`: remove-if-exists, then copy.
///
/// Not transactional; a failure mid-copy leaves a partial deploy dir, which
/// the next successful build overwrites.
pub fn swap_artifacts(dist_dir: &Path, deploy_dir: &Path) -> Result<()> {
    if !dist_dir.is_dir() {
        return Err(StackctlError::ConfigError(format!(
            "frontend dist directory {:?} does not exist; did the frontend build produce output?",
            dist_dir
        )));
    }

    if deploy_dir.exists() {
        fs::remove_dir_all(deploy_dir)
            .with_context(|| format!("removing old deploy dir {:?}", deploy_dir))?;
    }

    copy_dir_recursive(dist_dir, deploy_dir)?;
    info!(from = ?dist_dir, to = ?deploy_dir, "build artifacts deployed");
    Ok(())
}

/// Recursive directory copy; symlinks are followed.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("creating dir {:?}", dst))?;

    for entry in fs::read_dir(src).with_context(|| format!("reading dir {:?}", src))? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            fs::copy(&from, &to)
                .with_context(|| format!("copying {:?} to {:?}", from, to))?;
        }
    }
    Ok(())
}
