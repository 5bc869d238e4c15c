// src/proc/supervisor.rs

//! Start, stop and status-check the managed processes.
//!
//! The supervisor never owns a child's lifetime: children are spawned
//! detached (handle dropped, stdin closed, output redirected to a log file)
//! and re-discovered through the locator on every call. The check-then-spawn
//! sequence in `start_*` is deliberately not atomic; a race between the check
//! and the launch is a known, accepted limitation of this interactive tool.

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::model::{ServerConfig, ToolConfig};
use crate::errors::{Result, StackctlError};
use crate::proc::locator::{find_by_cmdline, find_processes, kill_pids, port_in_use};

/// Liveness of a managed process, re-derived from OS state on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Running { pids: Vec<u32> },
    Stopped,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Running { pids } if pids.is_empty() => write!(f, "running"),
            ProcessState::Running { pids } => write!(f, "running (pids {pids:?})"),
            ProcessState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Result of a stop request. Stopping something already stopped is an
/// idempotent no-op, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    AlreadyStopped,
    Terminated { pids: Vec<u32> },
}

/// Pure query: is the application server running?
///
/// Identity: process image is the configured interpreter *and* the full
/// command line contains the entry-point script path.
pub fn server_state(server: &ServerConfig) -> ProcessState {
    let interpreter = server.interpreter.clone();
    let entry = server.entry.clone();
    let pids =
        find_processes(|cmdline| cmdline.contains(&interpreter) && cmdline.contains(&entry));
    state_from_pids(pids)
}

/// Pure query: is the auxiliary tool running?
///
/// Identity is port-based only: a listener on the configured port counts as
/// running even though the listener is not verified to be this tool.
pub fn tool_state(tool: &ToolConfig) -> ProcessState {
    if port_in_use(tool.port) {
        // Port liveness cannot name a pid portably.
        ProcessState::Running { pids: Vec::new() }
    } else {
        ProcessState::Stopped
    }
}

/// Start the application server detached.
///
/// Fails with `AlreadyRunning` if the signature already matches. On spawn,
/// waits the settle delay and re-queries the process table; if the server
/// never appeared (or exited immediately), fails pointing at the log file,
/// which is created before the spawn so diagnostics survive.
pub async fn start_server(server: &ServerConfig) -> Result<()> {
    if let ProcessState::Running { pids } = server_state(server) {
        return Err(StackctlError::AlreadyRunning {
            name: "server".to_string(),
            pids,
        });
    }

    let log_path = create_log_path(Path::new(&server.log_dir), "server")?;
    let log = File::create(&log_path)
        .with_context(|| format!("creating log file {:?}", log_path))?;

    let mut cmd = Command::new(&server.interpreter);
    cmd.arg(&server.entry)
        .current_dir(&server.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log));
    for (key, val) in &server.env {
        cmd.env(key, val);
    }

    // Handle dropped on purpose: the child must outlive this invocation.
    cmd.spawn().with_context(|| {
        format!("spawning server: {} {}", server.interpreter, server.entry)
    })?;

    info!(
        interpreter = %server.interpreter,
        entry = %server.entry,
        log = ?log_path,
        "server spawned; waiting for it to settle"
    );
    sleep(server.settle_delay()).await;

    match server_state(server) {
        ProcessState::Running { pids } => {
            info!(?pids, "server is running");
            Ok(())
        }
        ProcessState::Stopped => Err(StackctlError::SpawnFailed {
            name: "server".to_string(),
            log: log_path,
        }),
    }
}

/// Start an auxiliary tool detached, unless its port already has a listener.
///
/// The short-circuit is a best-effort "don't double-start" policy: whatever
/// is listening is assumed to be the tool, without identity verification.
pub async fn start_tool(
    name: &str,
    tool: &ToolConfig,
    settle: std::time::Duration,
    log_dir: &Path,
) -> Result<()> {
    if port_in_use(tool.port) {
        info!(
            tool = name,
            port = tool.port,
            "port already has a listener; assuming the tool is running"
        );
        return Ok(());
    }

    let log_path = create_log_path(log_dir, name)?;
    let log = File::create(&log_path)
        .with_context(|| format!("creating log file {:?}", log_path))?;

    let mut cmd = shell_command(&tool.cmd);
    cmd.current_dir(&tool.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log));

    cmd.spawn()
        .with_context(|| format!("spawning tool '{}': {}", name, tool.cmd))?;

    info!(tool = name, cmd = %tool.cmd, log = ?log_path, "tool spawned; waiting for its port");
    sleep(settle).await;

    if port_in_use(tool.port) {
        info!(tool = name, port = tool.port, "tool is listening");
        Ok(())
    } else {
        Err(StackctlError::SpawnFailed {
            name: name.to_string(),
            log: log_path,
        })
    }
}

/// Stop the application server (forceful termination of every match).
pub fn stop_server(server: &ServerConfig) -> Result<StopOutcome> {
    let interpreter = server.interpreter.clone();
    let entry = server.entry.clone();
    let pids =
        find_processes(|cmdline| cmdline.contains(&interpreter) && cmdline.contains(&entry));
    stop_by_pids("server", pids)
}

/// Stop an auxiliary tool.
///
/// Termination matches the tool's configured launch command as a
/// command-line fragment; the port is only a liveness signal and cannot be
/// mapped back to a pid portably. A launch command that re-execs (npx and
/// friends) may leave a grandchild holding the port after the match is
/// killed, so the port is re-probed afterwards and a surviving listener is
/// reported for manual cleanup.
pub fn stop_tool(name: &str, tool: &ToolConfig) -> Result<StopOutcome> {
    let pids = find_by_cmdline(&tool.cmd);
    if pids.is_empty() && port_in_use(tool.port) {
        warn!(
            tool = name,
            port = tool.port,
            "a listener holds the tool's port but no process matches its \
             launch command; leaving it alone"
        );
    }
    let outcome = stop_by_pids(name, pids)?;
    if matches!(outcome, StopOutcome::Terminated { .. }) && port_in_use(tool.port) {
        warn!(
            tool = name,
            port = tool.port,
            "port still has a listener after termination; a child spawned \
             by the launch command may have survived and needs manual cleanup"
        );
    }
    Ok(outcome)
}

fn stop_by_pids(name: &str, pids: Vec<u32>) -> Result<StopOutcome> {
    if pids.is_empty() {
        info!(process = name, "already stopped");
        return Ok(StopOutcome::AlreadyStopped);
    }
    if pids.len() > 1 {
        warn!(process = name, ?pids, "more than one match; terminating all");
    }

    let killed = kill_pids(&pids);
    for pid in &pids {
        if killed.contains(pid) {
            info!(process = name, pid, "terminated");
        } else {
            warn!(process = name, pid, "termination signal not delivered");
        }
    }
    Ok(StopOutcome::Terminated { pids: killed })
}

fn state_from_pids(pids: Vec<u32>) -> ProcessState {
    if pids.is_empty() {
        ProcessState::Stopped
    } else {
        ProcessState::Running { pids }
    }
}

/// Build a timestamped log file path under `log_dir`, creating the
/// directory if needed. The file itself is created by the caller.
fn create_log_path(log_dir: &Path, label: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log dir {:?}", log_dir))?;
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(log_dir.join(format!("{label}-{stamp}.log")))
}

/// Platform-appropriate shell wrapper for user-configured commands.
fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_with_entry(entry: &str) -> ServerConfig {
        ServerConfig {
            entry: entry.to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn unmatched_server_signature_is_stopped() {
        let server = server_with_entry("stackctl-test-no-such-entry-4f2a.py");
        assert_eq!(server_state(&server), ProcessState::Stopped);
    }

    #[test]
    fn stop_on_stopped_server_is_a_noop() {
        let server = server_with_entry("stackctl-test-no-such-entry-4f2a.py");
        let outcome = stop_server(&server).unwrap();
        assert_eq!(outcome, StopOutcome::AlreadyStopped);
    }

    #[test]
    fn process_state_display_covers_all_shapes() {
        assert_eq!(ProcessState::Stopped.to_string(), "stopped");
        assert_eq!(
            ProcessState::Running { pids: Vec::new() }.to_string(),
            "running"
        );
        assert_eq!(
            ProcessState::Running { pids: vec![41, 42] }.to_string(),
            "running (pids [41, 42])"
        );
    }

    #[test]
    fn log_path_is_timestamped_under_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log_path(dir.path(), "server").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("server-"));
        assert!(name.ends_with(".log"));
        assert_eq!(path.parent().unwrap(), dir.path());
    }
}
