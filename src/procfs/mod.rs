// SPDX-License-Identifier: MIT
use simple_error::{bail, try_with};
use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::result::Result;

pub const CAP_NET_RAW: u32 = 13;
pub const CAP_IPC_LOCK: u32 = 14;

pub fn get_path() -> PathBuf {
    PathBuf::from(&env::var_os("CAPTEST_PROC").unwrap_or_else(|| OsString::from("/proc")))
}

/// Effective capability mask (`CapEff`) of the calling process.
pub fn effective_capabilities() -> Result<u64> {
    parse_effective_capabilities(&get_path().join("self").join("status"))
}

pub fn has_capability(mask: u64, cap: u32) -> bool {
    cap < 64 && mask & (1 << cap) != 0
}

fn parse_effective_capabilities(path: &Path) -> Result<u64> {
    let file = try_with!(
        File::open(path),
        "failed to open process status file {}",
        path.display()
    );
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = try_with!(line, "could not read line from {}", path.display());
        let mut columns = line.split('\t');
        if columns.next() != Some("CapEff:") {
            continue;
        }
        let cap_string = match columns.last() {
            Some(s) => s.trim(),
            None => bail!("malformed CapEff line in {}: '{}'", path.display(), line),
        };
        let cap = try_with!(
            u64::from_str_radix(cap_string, 16),
            "failed to parse capability '{}' from {}",
            cap_string,
            path.display()
        );
        return Ok(cap);
    }
    bail!(
        "could not find effective capabilities (CapEff) in {}",
        path.display()
    )
}
