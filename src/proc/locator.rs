// src/proc/locator.rs

//! Pure queries over OS-provided process and socket state.
//!
//! Managed processes are identified by re-derivable signatures, not stored
//! handles: a command-line fragment for the server, a listening port for
//! auxiliary tools. Nothing is cached between calls, so queries stay correct
//! across separate tool invocations.

use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::time::Duration;

use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(300);

/// Snapshot the OS process table.
fn process_table() -> System {
    System::new_with_specifics(
        RefreshKind::nothing().with_processes(ProcessRefreshKind::everything()),
    )
}

/// Return the pids of all processes whose full command line satisfies
/// `predicate`, excluding the current process. No side effects.
///
/// The expected cardinality is 0 or 1, but more than one match is tolerated
/// and reported in full; callers decide how to act on ambiguity.
pub fn find_processes(predicate: impl Fn(&str) -> bool) -> Vec<u32> {
    let own_pid = std::process::id();
    let table = process_table();

    let mut pids: Vec<u32> = table
        .processes()
        .iter()
        .filter(|(pid, _)| pid.as_u32() != own_pid)
        .filter(|(_, process)| predicate(&join_cmdline(process.cmd())))
        .map(|(pid, _)| pid.as_u32())
        .collect();

    pids.sort_unstable();
    pids
}

/// Return the pids of all processes whose command line contains `fragment`.
pub fn find_by_cmdline(fragment: &str) -> Vec<u32> {
    if fragment.is_empty() {
        return Vec::new();
    }
    find_processes(|cmdline| cmdline.contains(fragment))
}

/// Whether a listener accepts connections on `port` on localhost.
///
/// Tries both IPv4 and IPv6 loopback, since some tools bind one family only.
pub fn port_in_use(port: u16) -> bool {
    let candidates = [
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), port),
    ];
    candidates
        .iter()
        .any(|addr| TcpStream::connect_timeout(addr, CONNECT_TIMEOUT).is_ok())
}

/// Request forceful termination of the given pids.
///
/// Returns the pids that were actually signalled; pids that had already
/// exited (or could not be signalled) are skipped and logged.
pub fn kill_pids(pids: &[u32]) -> Vec<u32> {
    let table = process_table();
    let mut killed = Vec::new();

    for &pid in pids {
        match table.process(sysinfo::Pid::from_u32(pid)) {
            Some(process) => {
                if process.kill() {
                    killed.push(pid);
                } else {
                    debug!(pid, "kill signal could not be delivered");
                }
            }
            None => debug!(pid, "process already gone before kill"),
        }
    }
    killed
}

fn join_cmdline(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
