//! `log` backends for the bridge
//!
//! [`StderrLogger`] prints coloured `[LEVEL target] message` lines.
//! [`HostLogger`] sends errors and warnings to the host's own log so they
//! show up in the editor, and prints the rest like [`StderrLogger`].

use crate::config::LogConfig;
use crate::host::HostApi;
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use std::io::Write;

static LOGGER: OnceCell<Box<dyn Log>> = OnceCell::new();

const RESET: &str = "\x1b[0m";

fn color_code(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m", // Red
        Level::Warn => "\x1b[33m",  // Yellow
        Level::Info => "\x1b[32m",  // Green
        Level::Debug => "\x1b[36m", // Cyan
        Level::Trace => "\x1b[35m", // Magenta
    }
}

fn write_stderr(record: &Record) {
    let level = record.level();
    let _ = writeln!(
        std::io::stderr().lock(),
        "{}[{} {}]{} {}",
        color_code(level),
        level,
        record.target(),
        RESET,
        record.args()
    );
}

/// Prints every enabled record to stderr
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            write_stderr(record);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Forwards errors and warnings to the host
pub struct HostLogger {
    level: LevelFilter,
    host: &'static dyn HostApi,
}

impl HostLogger {
    pub fn new(level: LevelFilter, host: &'static dyn HostApi) -> Self {
        Self { level, host }
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        let file = record.file().unwrap_or("<unknown>");
        let line = record.line().unwrap_or(0);
        match record.level() {
            Level::Error => self.host.print_error(&message, record.target(), file, line),
            Level::Warn => self.host.print_warning(&message, record.target(), file, line),
            _ => write_stderr(record),
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the process logger. Only the first call has any effect, and a
/// logger installed by someone else is left alone.
pub fn init(config: &LogConfig, host: Option<&'static dyn HostApi>) {
    let logger = LOGGER.get_or_init(|| -> Box<dyn Log> {
        match host {
            Some(host) if config.forward_to_host => Box::new(HostLogger::new(config.level, host)),
            _ => Box::new(StderrLogger::new(config.level)),
        }
    });
    if log::set_logger(logger.as_ref()).is_ok() {
        log::set_max_level(config.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_logger_filters_by_level() {
        let logger = StderrLogger::new(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig {
            level: LevelFilter::Debug,
            forward_to_host: false,
        };
        init(&config, None);
        init(&config, None);
        log::debug!("logger installed");
    }
}
