// SPDX-License-Identifier: MIT
use log::debug;
use nix::errno::Errno;
use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use nix::unistd::ftruncate;
use std::ffi::CStr;
use std::fmt;
use std::num::NonZeroUsize;
use std::os::unix::io::{AsFd, BorrowedFd};

use super::{Probe, ProbeResult};
use crate::syscalls::flock::FlockGuard;
use crate::syscalls::mman::SharedMapping;

/// Size of the anonymous shared memory object
pub const SHM_SIZE: usize = 4096;

const SHM_LEN: NonZeroUsize = match NonZeroUsize::new(SHM_SIZE) {
    Some(len) => len,
    None => panic!("SHM_SIZE must not be zero"),
};

const SHM_NAME: &CStr = c"captest_shm";

/// A step of the shared memory lock sequence, named after its syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Create,
    Truncate,
    Map,
    Lock,
    Unlock,
    Unmap,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Create => "memfd_create",
            Step::Truncate => "ftruncate",
            Step::Map => "mmap",
            Step::Lock => "flock",
            Step::Unlock => "flock(LOCK_UN)",
            Step::Unmap => "munmap",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepError {
    pub step: Step,
    pub errno: Errno,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.errno)
    }
}

impl std::error::Error for StepError {}

trait AtStep<T> {
    fn at(self, step: Step) -> Result<T, StepError>;
}

impl<T> AtStep<T> for nix::Result<T> {
    fn at(self, step: Step) -> Result<T, StepError> {
        self.map_err(|errno| StepError { step, errno })
    }
}

/// Creates a memfd, sizes and maps it, then takes an exclusive non-blocking
/// `flock` on it.
///
/// Everything is released in reverse order before `run` returns. Any failing
/// step is reported as [`Outcome::Error`](super::Outcome::Error).
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedMemoryLockProbe;

impl SharedMemoryLockProbe {
    pub const NAME: &'static str = "ipc-lock";

    /// Size, map and lock `fd`, then release the lock and the mapping
    ///
    /// The descriptor itself is left open for the caller to close.
    pub fn exercise(&self, fd: BorrowedFd) -> Result<(), StepError> {
        ftruncate(fd, SHM_SIZE as libc::off_t).at(Step::Truncate)?;
        let mapping = SharedMapping::new(fd, SHM_LEN).at(Step::Map)?;
        debug!("mapped {} bytes of shared memory", mapping.len());
        let lock = FlockGuard::try_exclusive(fd).at(Step::Lock)?;

        lock.unlock().at(Step::Unlock)?;
        mapping.unmap().at(Step::Unmap)?;
        Ok(())
    }

    fn try_run(&self) -> Result<(), StepError> {
        let fd = memfd_create(SHM_NAME, MemFdCreateFlag::MFD_CLOEXEC).at(Step::Create)?;
        // fd outlives the lock and mapping taken in exercise()
        self.exercise(fd.as_fd())
    }
}

impl Probe for SharedMemoryLockProbe {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self) -> ProbeResult {
        to_result(self.try_run())
    }
}

fn to_result(res: Result<(), StepError>) -> ProbeResult {
    match res {
        Ok(()) => ProbeResult::success(
            SharedMemoryLockProbe::NAME,
            "IPC lock capability test successful",
        ),
        Err(e) => {
            debug!("shared memory lock sequence stopped at {}", e.step);
            ProbeResult::error(
                SharedMemoryLockProbe::NAME,
                format!("IPC lock capability test failed: {}", e),
            )
        }
    }
}
