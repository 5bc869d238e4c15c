// src/lock.rs

//! File-based build lock.
//!
//! Serializes build-pipeline runs across concurrent `stackctl` invocations
//! using a single well-known file whose content is the owning pid. There is
//! no staleness detection: a crashed build leaves the lock in place until an
//! operator deletes it, and the `LockHeld` error says so. The check-then-
//! create sequence is not atomic; the narrow race window between two
//! simultaneous acquires is accepted because builds are manually triggered.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::errors::{Result, StackctlError};

/// Guard holding the build lock. Released on drop (owner-checked), so every
/// exit path out of the guarded work releases it.
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
    owner: u32,
    released: bool,
}

impl BuildLock {
    /// Acquire the lock at `path`, writing the current pid as its content.
    ///
    /// Fails with `LockHeld` (naming the recorded owner) if the file already
    /// exists; the existing file is never modified in that case.
    pub fn acquire(path: &Path) -> Result<Self> {
        if path.exists() {
            let owner = fs::read_to_string(path)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(StackctlError::LockHeld {
                owner,
                path: path.to_path_buf(),
            });
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating lock dir {:?}", parent))?;
            }
        }

        let pid = std::process::id();
        fs::write(path, format!("{pid}\n"))
            .with_context(|| format!("writing lock file {:?}", path))?;
        debug!(path = ?path, pid, "build lock acquired");

        Ok(Self {
            path: path.to_path_buf(),
            owner: pid,
            released: false,
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pid recorded in the lock file by this guard.
    pub fn owner_pid(&self) -> u32 {
        self.owner
    }

    /// Release the lock explicitly. Equivalent to dropping the guard.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        release_path(&self.path, self.owner);
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Owner-checked removal of a lock file.
///
/// Deletes the file only if its content names `own_pid`; a lock held by
/// someone else (possible only if exclusivity was violated, e.g. manual
/// tampering) is left untouched with a warning.
pub fn release_path(path: &Path, own_pid: u32) {
    let recorded = fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok());

    match recorded {
        Some(pid) if pid == own_pid => {
            if let Err(err) = fs::remove_file(path) {
                warn!(path = ?path, error = %err, "failed to remove lock file");
            } else {
                debug!(path = ?path, pid = own_pid, "build lock released");
            }
        }
        Some(pid) => {
            warn!(
                path = ?path,
                recorded_pid = pid,
                own_pid,
                "lock file is owned by another process; leaving it in place"
            );
        }
        None => {
            warn!(
                path = ?path,
                own_pid,
                "lock file missing or unreadable at release"
            );
        }
    }
}
