// SPDX-License-Identifier: MIT
use log::{debug, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::probe::{Probe, ProbeResult};
use crate::procfs::{self, CAP_IPC_LOCK, CAP_NET_RAW};

/// Aggregate status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every probe succeeded
    Success,
    /// At least one probe reported a failure or an error
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    results: Vec<ProbeResult>,
}

impl RunSummary {
    /// Results in execution order
    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn status(&self) -> Status {
        if self.results.iter().all(ProbeResult::is_success) {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

/// Runs probes one after another, in the order they were added
#[derive(Default)]
pub struct ProbeRunner {
    probes: Vec<Box<dyn Probe>>,
}

impl ProbeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, probe: Box<dyn Probe>) -> &mut Self {
        self.probes.push(probe);
        self
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn run(&self) -> RunSummary {
        self.run_with(|_| {})
    }

    /// Run every probe exactly once, handing each result to `on_result` as
    /// soon as it is available
    ///
    /// A failing or panicking probe never stops the probes after it.
    pub fn run_with<F>(&self, mut on_result: F) -> RunSummary
    where
        F: FnMut(&ProbeResult),
    {
        log_capabilities();

        let mut results = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            debug!("running probe {}", probe.name());
            let result = run_isolated(probe.as_ref());
            debug!("probe {} finished: {}", result.probe_name(), result.outcome());
            on_result(&result);
            results.push(result);
        }
        RunSummary { results }
    }
}

impl FromIterator<Box<dyn Probe>> for ProbeRunner {
    fn from_iter<I: IntoIterator<Item = Box<dyn Probe>>>(iter: I) -> Self {
        ProbeRunner {
            probes: iter.into_iter().collect(),
        }
    }
}

fn run_isolated(probe: &dyn Probe) -> ProbeResult {
    match panic::catch_unwind(AssertUnwindSafe(|| probe.run())) {
        Ok(result) => result,
        Err(payload) => ProbeResult::error(
            probe.name(),
            format!("probe panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

fn log_capabilities() {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    match procfs::effective_capabilities() {
        Ok(mask) => {
            debug!("effective capabilities: {:#018x}", mask);
            debug!(
                "CAP_NET_RAW {}, CAP_IPC_LOCK {}",
                held(procfs::has_capability(mask, CAP_NET_RAW)),
                held(procfs::has_capability(mask, CAP_IPC_LOCK))
            );
        }
        Err(e) => warn!("cannot read effective capabilities: {}", e),
    }
}

fn held(present: bool) -> &'static str {
    if present {
        "held"
    } else {
        "not held"
    }
}
