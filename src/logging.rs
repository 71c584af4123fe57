// SPDX-License-Identifier: MIT
use log::{LevelFilter, Metadata, Record};
use simple_error::{bail, try_with};
use std::env;

use crate::result::Result;

struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Parse a level name as accepted in `CAPTEST_LOG`.
pub(crate) fn parse_level(s: &str) -> Result<LevelFilter> {
    match s.trim().parse::<LevelFilter>() {
        Ok(level) => Ok(level),
        Err(_) => bail!(
            "invalid log level '{}', expected one of off, error, warn, info, debug, trace",
            s
        ),
    }
}

/// Level from `CAPTEST_LOG`, `warn` when unset. `verbose` forces `debug`.
pub(crate) fn level_from_env(verbose: bool) -> Result<LevelFilter> {
    level_from_value(verbose, env::var("CAPTEST_LOG").ok().as_deref())
}

fn level_from_value(verbose: bool, value: Option<&str>) -> Result<LevelFilter> {
    if verbose {
        return Ok(LevelFilter::Debug);
    }
    match value {
        // set but empty counts as unset
        Some(value) if !value.trim().is_empty() => parse_level(value),
        _ => Ok(LevelFilter::Warn),
    }
}

pub(crate) fn init(level: LevelFilter) -> Result<()> {
    try_with!(log::set_logger(&LOGGER), "failed to install logger");
    log::set_max_level(level);
    Ok(())
}
