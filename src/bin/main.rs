// SPDX-License-Identifier: MIT
use std::process::ExitCode;

fn main() -> ExitCode {
    match captest::cli::run_with_args(std::env::args_os()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("captest: {}", err);
            ExitCode::FAILURE
        }
    }
}
