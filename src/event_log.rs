//! Process-wide logger with an optional event log file.
//!
//! Console output goes through `env_logger` and honors `RUST_LOG` (default
//! `warn`). Once [`EventLogger::enable_file`] is called, every record at
//! `INFO` or above is also appended to the event log file as
//! `2024-05-01 12:00:00,123 - INFO - message`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;

static EVENT_LOGGER: OnceCell<&'static EventLogger> = OnceCell::new();

struct FileSink {
    path: PathBuf,
    file: File,
}

pub struct EventLogger {
    console: env_logger::Logger,
    file: Mutex<Option<FileSink>>,
}

/// Installs the global logger on first call and returns it.
///
/// Later calls return the same instance. If another logger was installed
/// first, the returned instance is not wired to the `log` macros.
pub fn init() -> &'static EventLogger {
    EVENT_LOGGER.get_or_init(|| {
        let logger: &'static EventLogger = Box::leak(Box::new(EventLogger::from_env()));
        if log::set_logger(logger).is_ok() {
            log::set_max_level(logger.max_level());
        }
        logger
    })
}

impl EventLogger {
    /// Console filter from `RUST_LOG`, `warn` when unset.
    pub fn from_env() -> Self {
        let console =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
                .build();
        Self::new(console)
    }

    pub fn new(console: env_logger::Logger) -> Self {
        Self {
            console,
            file: Mutex::new(None),
        }
    }

    /// The file sink needs `INFO` records even when the console is quieter.
    pub fn max_level(&self) -> LevelFilter {
        self.console.filter().max(LevelFilter::Info)
    }

    /// Starts appending events to `path`.
    ///
    /// Returns `Ok(false)` if events already go to that file.
    pub fn enable_file(&self, path: &Path) -> io::Result<bool> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("event log lock poisoned"))?;
        if guard.as_ref().is_some_and(|sink| sink.path == path) {
            return Ok(false);
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        *guard = Some(FileSink {
            path: path.to_path_buf(),
            file,
        });
        Ok(true)
    }

    #[cfg(test)]
    fn file_path(&self) -> Option<PathBuf> {
        self.file
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|sink| sink.path.clone()))
    }

    fn write_event(&self, record: &Record) {
        if record.level() > Level::Info {
            return;
        }
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if let Some(sink) = guard.as_mut() {
            let line = format_event_line(&Local::now(), record.level(), record.args());
            // A logger has nowhere to report its own write failures.
            let _ = sink.file.write_all(line.as_bytes());
        }
    }
}

impl Log for EventLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata) || metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        self.write_event(record);
    }

    fn flush(&self) {
        self.console.flush();
        if let Ok(mut guard) = self.file.lock() {
            if let Some(sink) = guard.as_mut() {
                let _ = sink.file.flush();
            }
        }
    }
}

/// `WARN` is spelled out as `WARNING`, as syslog tooling expects.
fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// One event log line, newline included.
pub fn format_event_line(
    timestamp: &DateTime<Local>,
    level: Level,
    message: impl fmt::Display,
) -> String {
    format!(
        "{} - {} - {}\n",
        timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
        level_name(level),
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quiet_logger() -> EventLogger {
        EventLogger::new(
            env_logger::Builder::new()
                .filter_level(LevelFilter::Off)
                .build(),
        )
    }

    fn emit(logger: &EventLogger, level: Level, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target("routerctl::ops")
                .args(format_args!("{message}"))
                .build(),
        );
    }

    #[test]
    fn event_line_uses_syslog_style_layout() {
        let ts = Local
            .with_ymd_and_hms(2024, 5, 1, 9, 30, 5)
            .single()
            .unwrap();

        assert_eq!(
            format_event_line(&ts, Level::Info, "Hostname changed to R2"),
            "2024-05-01 09:30:05,000 - INFO - Hostname changed to R2\n"
        );
        assert_eq!(
            format_event_line(&ts, Level::Warn, "x"),
            "2024-05-01 09:30:05,000 - WARNING - x\n"
        );
    }

    #[test]
    fn records_go_to_file_only_after_enabling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.txt");
        let logger = quiet_logger();

        emit(&logger, Level::Info, "before");
        assert!(!path.exists());

        assert!(logger.enable_file(&path).unwrap());
        emit(&logger, Level::Info, "configured hostname");
        emit(&logger, Level::Debug, "too chatty");
        emit(&logger, Level::Error, "push failed");
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");
        assert!(lines[0].ends_with(" - INFO - configured hostname"));
        assert!(lines[1].ends_with(" - ERROR - push failed"));
    }

    #[test]
    fn enabling_twice_keeps_one_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.txt");
        let logger = quiet_logger();

        assert!(logger.enable_file(&path).unwrap());
        assert!(!logger.enable_file(&path).unwrap());
        emit(&logger, Level::Info, "once");

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(logger.file_path(), Some(path));
    }

    #[test]
    fn file_level_floor_is_info() {
        assert_eq!(quiet_logger().max_level(), LevelFilter::Info);
    }
}
