// SPDX-License-Identifier: MIT
//! Advisory `flock(2)` locks bound to a borrowed descriptor
//!
//! `nix::fcntl::Flock` takes ownership of the file it locks, which would close
//! the descriptor before a mapping of it is torn down. This guard only borrows
//! the descriptor, so callers control the release order.

use nix::errno::Errno;
use std::os::unix::io::{AsRawFd, BorrowedFd};

/// Exclusive advisory lock, released when dropped
pub struct FlockGuard<'fd> {
    fd: BorrowedFd<'fd>,
    locked: bool,
}

impl<'fd> FlockGuard<'fd> {
    /// Take an exclusive lock without waiting
    ///
    /// Returns `EWOULDBLOCK` if another open file description holds a
    /// conflicting lock.
    pub fn try_exclusive(fd: BorrowedFd<'fd>) -> nix::Result<Self> {
        let res = unsafe { libc::flock(fd.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        Errno::result(res)?;
        Ok(FlockGuard { fd, locked: true })
    }

    /// Release the lock, reporting the error that `Drop` would swallow
    pub fn unlock(mut self) -> nix::Result<()> {
        self.locked = false;
        unlock(self.fd)
    }
}

impl Drop for FlockGuard<'_> {
    fn drop(&mut self) {
        if self.locked {
            if let Err(e) = unlock(self.fd) {
                log::warn!("failed to release lock on fd {}: {}", self.fd.as_raw_fd(), e);
            }
        }
    }
}

fn unlock(fd: BorrowedFd) -> nix::Result<()> {
    let res = unsafe { libc::flock(fd.as_raw_fd(), libc::LOCK_UN) };
    Errno::result(res).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, OpenOptions};
    use std::os::unix::io::AsFd;

    fn temp_file(name: &str) -> (std::path::PathBuf, File) {
        let path = std::env::temp_dir().join(format!("captest-{}-{}", name, std::process::id()));
        let file = File::create(&path).unwrap();
        (path, file)
    }

    #[test]
    fn test_conflicting_lock_does_not_block() {
        let (path, first) = temp_file("flock-conflict");
        // a second open() gives a separate open file description
        let second = OpenOptions::new().read(true).open(&path).unwrap();

        let guard = FlockGuard::try_exclusive(first.as_fd()).unwrap();
        let err = FlockGuard::try_exclusive(second.as_fd()).err();
        assert_eq!(err, Some(Errno::EWOULDBLOCK));

        guard.unlock().unwrap();
        let again = FlockGuard::try_exclusive(second.as_fd()).unwrap();
        drop(again);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_drop_releases_lock() {
        let (path, first) = temp_file("flock-drop");
        let second = OpenOptions::new().read(true).open(&path).unwrap();
        {
            let _guard = FlockGuard::try_exclusive(first.as_fd()).unwrap();
        }
        assert!(FlockGuard::try_exclusive(second.as_fd()).is_ok());
        std::fs::remove_file(&path).unwrap();
    }
}
