// SPDX-License-Identifier: MIT
//! Capability probes
//!
//! A probe performs one privileged operation and folds whatever happens into
//! a [`ProbeResult`]. Probes never return errors or leak kernel resources.

use std::fmt;

mod ipc_lock;
mod raw_socket;

pub use ipc_lock::{SharedMemoryLockProbe, Step, StepError, SHM_SIZE};
pub use raw_socket::RawSocketProbe;

/// How a probe run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The privileged operation succeeded
    Success,
    /// The kernel refused the operation, e.g. a missing capability
    Failure,
    /// A step of a multi-step probe failed, or the probe itself broke
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
            Outcome::Error => "ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    probe_name: &'static str,
    outcome: Outcome,
    detail: String,
}

impl ProbeResult {
    pub fn new(probe_name: &'static str, outcome: Outcome, detail: impl Into<String>) -> Self {
        ProbeResult {
            probe_name,
            outcome,
            detail: detail.into(),
        }
    }

    pub fn success(probe_name: &'static str, detail: impl Into<String>) -> Self {
        Self::new(probe_name, Outcome::Success, detail)
    }

    pub fn failure(probe_name: &'static str, detail: impl Into<String>) -> Self {
        Self::new(probe_name, Outcome::Failure, detail)
    }

    pub fn error(probe_name: &'static str, detail: impl Into<String>) -> Self {
        Self::new(probe_name, Outcome::Error, detail)
    }

    pub fn probe_name(&self) -> &'static str {
        self.probe_name
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Human readable cause or confirmation
    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

pub trait Probe {
    /// Stable name used on the command line and in machine readable output
    fn name(&self) -> &'static str;

    /// Perform the operation once and release everything it acquired
    fn run(&self) -> ProbeResult;
}

/// Names of all registered probes, in default execution order
pub const PROBE_NAMES: &[&str] = &[RawSocketProbe::NAME, SharedMemoryLockProbe::NAME];

pub fn lookup_probe(name: &str) -> Option<Box<dyn Probe>> {
    match name {
        RawSocketProbe::NAME => Some(Box::new(RawSocketProbe)),
        SharedMemoryLockProbe::NAME => Some(Box::new(SharedMemoryLockProbe)),
        _ => None,
    }
}

pub fn all_probes() -> Vec<Box<dyn Probe>> {
    PROBE_NAMES.iter().filter_map(|name| lookup_probe(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order() {
        let names: Vec<&str> = all_probes().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["net-raw", "ipc-lock"]);
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup_probe("cap-sys-admin").is_none());
        assert!(lookup_probe("").is_none());
    }

    #[test]
    fn test_lookup_returns_named_probe() {
        for name in PROBE_NAMES {
            assert_eq!(lookup_probe(name).unwrap().name(), *name);
        }
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Success.to_string(), "SUCCESS");
        assert_eq!(Outcome::Failure.to_string(), "FAILURE");
        assert_eq!(Outcome::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_result_constructors() {
        let r = ProbeResult::failure("net-raw", "denied");
        assert_eq!(r.probe_name(), "net-raw");
        assert_eq!(r.outcome(), Outcome::Failure);
        assert_eq!(r.detail(), "denied");
        assert!(!r.is_success());
        assert!(ProbeResult::success("x", "ok").is_success());
        assert_eq!(ProbeResult::error("x", "boom").outcome(), Outcome::Error);
    }
}
