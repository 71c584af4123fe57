// SPDX-License-Identifier: MIT
//! Syscall wrappers for captest
//!
//! RAII guards for kernel resources whose release nix does not tie to a
//! borrowed descriptor's lifetime.

pub mod flock;
pub mod mman;
