//! Common test utilities for integration tests

use std::process::{Command, Output};

// Re-export from library
#[allow(unused_imports)]
pub(crate) use captest::test_utils::{run_forked, run_in_net_namespace};

pub(crate) const RAW_SOCKET_OK: &str = "Raw socket successfully created.";
pub(crate) const RAW_SOCKET_ERR: &str = "Error creating raw socket: ";
pub(crate) const IPC_LOCK_OK: &str = "IPC lock capability test successful";
pub(crate) const IPC_LOCK_ERR: &str = "IPC lock capability test failed: ";

/// Run the captest binary with a clean logging environment
pub(crate) fn captest(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_captest"))
        .args(args)
        .env_remove("CAPTEST_LOG")
        .env_remove("CAPTEST_PROC")
        .output()
        .expect("Failed to execute captest")
}

pub(crate) fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8(output.stdout.clone())
        .expect("stdout is not UTF-8")
        .lines()
        .map(String::from)
        .collect()
}
