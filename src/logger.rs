//! Minimal stderr logger for the [`log`] facade.
//!
//! stdout carries the protocol, so diagnostics never go there. Debug builds
//! log at `Debug`, release builds only at `Warn` and above.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = writeln!(std::io::stderr(), "{}", format_record(record));
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn format_record(record: &Record) -> String {
    let tag = match record.level() {
        Level::Error => "error",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    };
    format!("[{}] {}: {}", tag, record.target(), record.args())
}

/// Level used when none is given: chatty in debug builds, quiet in release.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Install the logger. A second call is a no-op.
pub fn init(level: LevelFilter) {
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}
