use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use sentry_log::SentryLogger;

pub struct Logger {
    level: LevelFilter,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} [{}] {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(), record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger behind Sentry's breadcrumb/event forwarder.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = SentryLogger::with_dest(Logger { level });

    log::set_boxed_logger(Box::new(logger))
        .map(|()| log::set_max_level(level))
}
