// SPDX-License-Identifier: MIT
//! Probes that check whether the current process may use privileged kernel
//! facilities: raw packet sockets and locked shared memory.

pub mod test_utils;

pub mod cli;
mod logging;
pub mod probe;
pub mod procfs;
pub mod report;
mod result;
pub mod runner;
pub mod syscalls;

pub use probe::{Outcome, Probe, ProbeResult, RawSocketProbe, SharedMemoryLockProbe};
pub use report::{Format, Reporter};
pub use runner::{ProbeRunner, RunSummary, Status};
