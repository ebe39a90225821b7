//! Console logger for headless runs.
//!
//! Prints `[LEVEL] target: message` to stderr so stdout stays free for
//! whatever is piping into or out of the bench.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub struct ConsoleLogger {
    max_level: Level,
}

impl ConsoleLogger {
    pub const fn new(max_level: Level) -> Self {
        Self { max_level }
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

pub fn format_record(record: &Record) -> String {
    format!(
        "[{}] {}: {}",
        level_str(record.level()),
        record.target(),
        record.args()
    )
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let _ = writeln!(std::io::stderr().lock(), "{}", format_record(record));
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: ConsoleLogger = ConsoleLogger::new(Level::Trace);

/// Install the console logger. Does nothing if a logger is already set.
pub fn init(max_level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(max_level);
    }
}
