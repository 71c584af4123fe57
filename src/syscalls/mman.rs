// SPDX-License-Identifier: MIT
//! Shared file mappings with RAII unmapping

use nix::sys::mman::{self, MapFlags, ProtFlags};
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::os::unix::io::BorrowedFd;
use std::ptr::NonNull;

/// A `MAP_SHARED` read/write mapping of a file, unmapped when dropped
///
/// The mapping stays valid after the descriptor is closed, but callers are
/// expected to drop it first.
pub struct SharedMapping {
    addr: NonNull<c_void>,
    len: NonZeroUsize,
    mapped: bool,
}

impl SharedMapping {
    /// Map `len` bytes of `fd` starting at offset 0
    pub fn new(fd: BorrowedFd, len: NonZeroUsize) -> nix::Result<Self> {
        let addr = unsafe {
            mman::mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                fd,
                0,
            )?
        };
        Ok(SharedMapping {
            addr,
            len,
            mapped: true,
        })
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Unmap now, reporting the error that `Drop` would swallow
    pub fn unmap(mut self) -> nix::Result<()> {
        self.mapped = false;
        unsafe { mman::munmap(self.addr, self.len.get()) }
    }
}

impl Drop for SharedMapping {
    fn drop(&mut self) {
        if self.mapped {
            if let Err(e) = unsafe { mman::munmap(self.addr, self.len.get()) } {
                log::warn!("failed to unmap {} bytes at {:p}: {}", self.len, self.addr, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::run_forked;
    use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
    use nix::unistd::ftruncate;
    use std::os::unix::io::AsFd;

    fn is_mapped(addr: NonNull<c_void>) -> bool {
        let prefix = format!("{:08x}-", addr.as_ptr() as usize);
        std::fs::read_to_string("/proc/self/maps")
            .unwrap()
            .lines()
            .any(|l| l.starts_with(&prefix))
    }

    fn shm_fd() -> std::os::unix::io::OwnedFd {
        let fd = memfd_create(c"captest-mman", MemFdCreateFlag::MFD_CLOEXEC).unwrap();
        ftruncate(&fd, 4096).unwrap();
        fd
    }

    #[test]
    fn test_unmap() {
        // other test threads may map at the freed address, so check in a child
        run_forked(|| {
            let fd = shm_fd();
            let len = NonZeroUsize::new(4096).unwrap();
            let mapping = SharedMapping::new(fd.as_fd(), len).unwrap();
            assert_eq!(mapping.len(), 4096);
            let addr = mapping.addr;
            assert!(is_mapped(addr));
            mapping.unmap().unwrap();
            assert!(!is_mapped(addr));
        });
    }

    #[test]
    fn test_drop_unmaps() {
        run_forked(|| {
            let fd = shm_fd();
            let len = NonZeroUsize::new(4096).unwrap();
            let mapping = SharedMapping::new(fd.as_fd(), len).unwrap();
            let addr = mapping.addr;
            drop(mapping);
            assert!(!is_mapped(addr));
        });
    }

    #[test]
    fn test_read_only_descriptor_is_refused() {
        // MAP_SHARED with PROT_WRITE needs a writable descriptor
        let file = std::fs::File::open("/proc/self/status").unwrap();
        let len = NonZeroUsize::new(4096).unwrap();
        assert!(SharedMapping::new(file.as_fd(), len).is_err());
    }
}
