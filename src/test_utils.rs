// SPDX-License-Identifier: MIT
//! Test utilities shared between unit and integration tests

use nix::errno::Errno;
use nix::sched::{unshare, CloneFlags};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult};

const CHILD_PASSED: i32 = 0;
const CHILD_FAILED: i32 = 1;
const CHILD_SKIPPED: i32 = 77;

const LINUX_CAPABILITY_VERSION_3: u32 = 0x2008_0522;

#[repr(C)]
struct CapUserHeader {
    version: u32,
    pid: libc::c_int,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct CapUserData {
    effective: u32,
    permitted: u32,
    inheritable: u32,
}

/// Remove `cap` from the effective set of the calling thread
///
/// Lowering the effective set needs no privilege. Only call this in a forked
/// child, the capability stays dropped for the rest of the process.
pub fn drop_effective_capability(cap: u32) -> nix::Result<()> {
    let mut header = CapUserHeader {
        version: LINUX_CAPABILITY_VERSION_3,
        pid: 0,
    };
    let mut data = [CapUserData::default(); 2];

    let res = unsafe { libc::syscall(libc::SYS_capget, &mut header, data.as_mut_ptr()) };
    Errno::result(res)?;

    let index = (cap / 32) as usize;
    if index >= data.len() {
        return Err(Errno::EINVAL);
    }
    data[index].effective &= !(1 << (cap % 32));

    let res = unsafe { libc::syscall(libc::SYS_capset, &mut header, data.as_ptr()) };
    Errno::result(res).map(drop)
}

/// Run `test_fn` in a forked child and wait for it
///
/// A panic in the child fails the calling test.
pub fn run_forked<F>(test_fn: F)
where
    F: FnOnce(),
{
    if !fork_and_wait(|| {
        test_fn();
        true
    }) {
        panic!("forked test unexpectedly skipped");
    }
}

/// Run `test_fn` in a forked child that is root in a fresh user namespace
/// owning a fresh network namespace
///
/// Returns `false` without running `test_fn` when the namespaces cannot be
/// created, e.g. when unprivileged user namespaces are disabled.
pub fn run_in_net_namespace<F>(test_fn: F) -> bool
where
    F: FnOnce(),
{
    fork_and_wait(|| {
        // Get current UID/GID before unshare
        let uid = nix::unistd::getuid();
        let gid = nix::unistd::getgid();

        if let Err(e) = unshare(CloneFlags::CLONE_NEWUSER | CloneFlags::CLONE_NEWNET) {
            eprintln!("Failed to create user/network namespace: {}", e);
            return false;
        }

        // Map our current UID to 0 (root) in the new namespace so that
        // capabilities survive execve()
        std::fs::write("/proc/self/setgroups", b"deny").expect("Failed to write setgroups");
        std::fs::write("/proc/self/uid_map", format!("0 {} 1\n", uid))
            .expect("Failed to write uid_map");
        std::fs::write("/proc/self/gid_map", format!("0 {} 1\n", gid))
            .expect("Failed to write gid_map");

        test_fn();
        true
    })
}

/// Returns `false` if the child reported a skip, panics if it failed
fn fork_and_wait<F>(child_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            // Run the test - panics will cause child to exit with non-zero
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(child_fn));

            let code = match result {
                Ok(true) => CHILD_PASSED,
                Ok(false) => CHILD_SKIPPED,
                Err(_) => CHILD_FAILED,
            };
            unsafe { libc::_exit(code) }
        }
        Ok(ForkResult::Parent { child }) => match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, CHILD_PASSED)) => true,
            Ok(WaitStatus::Exited(_, CHILD_SKIPPED)) => false,
            Ok(WaitStatus::Exited(_, code)) => {
                panic!("Test failed with exit code {}", code);
            }
            Ok(status) => {
                panic!("Test process terminated abnormally: {:?}", status);
            }
            Err(e) => {
                panic!("waitpid failed: {}", e);
            }
        },
        Err(e) => {
            panic!("Failed to fork test process: {}", e);
        }
    }
}
