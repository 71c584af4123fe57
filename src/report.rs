// SPDX-License-Identifier: MIT
use std::io::{self, Write};
use std::process::ExitCode;

use crate::probe::ProbeResult;
use crate::runner::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// The probe's message, one line per probe
    #[default]
    Text,
    /// `name<TAB>OUTCOME<TAB>detail`, one line per probe
    Tsv,
}

/// Writes one line per probe result and flushes after each line
pub struct Reporter<W: Write> {
    out: W,
    format: Format,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: Format) -> Self {
        Reporter { out, format }
    }

    pub fn report(&mut self, result: &ProbeResult) -> io::Result<()> {
        match self.format {
            Format::Text => writeln!(self.out, "{}", single_line(result.detail()))?,
            Format::Tsv => writeln!(
                self.out,
                "{}\t{}\t{}",
                result.probe_name(),
                result.outcome(),
                single_line(result.detail()).replace('\t', " ")
            )?,
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// panic payloads may span several lines
fn single_line(detail: &str) -> String {
    detail.lines().collect::<Vec<_>>().join(" ")
}

fn exit_status(status: Status) -> u8 {
    match status {
        Status::Success => 0,
        Status::Failure => 1,
    }
}

pub fn exit_code(status: Status) -> ExitCode {
    ExitCode::from(exit_status(status))
}
