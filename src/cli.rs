// SPDX-License-Identifier: MIT
use clap::error::ErrorKind;
use clap::Parser;
use log::debug;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use crate::logging;
use crate::probe::{self, Probe};
use crate::report::{self, Format, Reporter};
use crate::runner::ProbeRunner;

/// Check whether this environment grants raw sockets and shared memory locks
#[derive(Parser, Debug)]
#[command(name = "captest", version, about, long_about = None)]
struct Args {
    /// Probes to run, in order [default: all]
    #[arg(value_name = "PROBE", value_parser = parse_probe_name)]
    probes: Vec<String>,

    /// List available probes and exit
    #[arg(short, long)]
    list: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log debug information to stderr (overrides CAPTEST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_probe_name(s: &str) -> Result<String, String> {
    if probe::lookup_probe(s).is_some() {
        Ok(s.to_string())
    } else {
        Err(format!(
            "unknown probe '{}', expected one of: {}",
            s,
            probe::PROBE_NAMES.join(", ")
        ))
    }
}

fn selected_probes(names: &[String]) -> Vec<Box<dyn Probe>> {
    if names.is_empty() {
        return probe::all_probes();
    }
    // names were validated while parsing
    names
        .iter()
        .filter_map(|name| probe::lookup_probe(name))
        .collect()
}

pub fn run_with_args<I, T>(args: I) -> Result<ExitCode, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(e.into()),
    };

    logging::init(logging::level_from_env(args.verbose)?)?;

    let stdout = io::stdout();
    if args.list {
        let mut out = stdout.lock();
        for name in probe::PROBE_NAMES {
            writeln!(out, "{}", name)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let runner: ProbeRunner = selected_probes(&args.probes).into_iter().collect();
    debug!("running {} probe(s)", runner.len());

    let mut reporter = Reporter::new(stdout.lock(), args.format);
    let mut write_error = None;
    let summary = runner.run_with(|result| {
        if write_error.is_none() {
            write_error = reporter.report(result).err();
        }
    });
    if let Some(e) = write_error {
        return Err(format!("failed to write report: {}", e).into());
    }

    Ok(report::exit_code(summary.status()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("captest").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert!(args.probes.is_empty());
        assert!(!args.list);
        assert!(!args.verbose);
        assert_eq!(args.format, Format::Text);
        let names: Vec<&str> = selected_probes(&args.probes)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, probe::PROBE_NAMES);
    }

    #[test]
    fn test_probe_selection_keeps_order() {
        let args = parse(&["ipc-lock", "net-raw", "ipc-lock"]).unwrap();
        let names: Vec<&str> = selected_probes(&args.probes)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["ipc-lock", "net-raw", "ipc-lock"]);
    }

    #[test]
    fn test_unknown_probe() {
        let err = parse(&["cap-sys-admin"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let message = err.to_string();
        assert!(
            message.contains("unknown probe 'cap-sys-admin', expected one of: net-raw, ipc-lock"),
            "{}",
            message
        );
    }

    #[test]
    fn test_flags() {
        let args = parse(&["-v", "--format", "tsv", "-l"]).unwrap();
        assert!(args.verbose);
        assert!(args.list);
        assert_eq!(args.format, Format::Tsv);
    }

    #[test]
    fn test_invalid_format() {
        assert!(parse(&["--format", "json"]).is_err());
    }

    #[test]
    fn test_help_is_not_an_error() {
        let code = run_with_args(["captest", "--help"]);
        assert!(code.is_ok());
    }
}
