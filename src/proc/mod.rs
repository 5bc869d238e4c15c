// src/proc/mod.rs

pub mod locator;
pub mod supervisor;

pub use locator::{find_by_cmdline, kill_pids, port_in_use};
pub use supervisor::{ProcessState, StopOutcome};
