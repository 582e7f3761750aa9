//! Logger facade
//!
//! [`Logger`] is a cheap, cloneable handle. Every clone shares one formatter,
//! one level gate, one disk writer and at most one retention manager.

use std::sync::Arc;
use std::time::Duration;

use crossterm::style::Stylize;
use tokio::runtime::Handle;

use crate::clock::{Clock, LogZone, SystemClock};
use crate::config::LoggerConfig;
use crate::console::{ConsoleReporter, ConsoleSink, Reporter, StdConsole};
use crate::disk::{DiskWriter, RetentionManager, RetentionPolicy, DEFAULT_SWEEP_INTERVAL};
use crate::error::{LoggerError, Result};
use crate::format::{Formatter, Part};
use crate::level::{Level, LevelGate, SinkKind};

/// Builds a [`Logger`] from a [`LoggerConfig`]
pub struct LoggerBuilder {
    config: LoggerConfig,
    clock: Arc<dyn Clock>,
    console: Arc<dyn ConsoleSink>,
    reporter: Option<Arc<dyn Reporter>>,
    sweep_interval: Duration,
}

impl LoggerBuilder {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            console: Arc::new(StdConsole),
            reporter: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Replace the time source
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the console sink
    pub fn console(mut self, console: impl ConsoleSink) -> Self {
        self.console = Arc::new(console);
        self
    }

    /// Receive internal failures instead of printing them to the console
    pub fn reporter(mut self, reporter: impl Reporter) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Period between retention sweeps
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Create directories, start retention and return the logger
    ///
    /// Failing to create the log or archive directory is the only error.
    /// Called inside a tokio runtime, background work runs on it; otherwise
    /// the writer and retention use their own threads.
    pub fn build(self) -> Result<Logger> {
        let LoggerBuilder {
            config,
            clock,
            console,
            reporter,
            sweep_interval,
        } = self;

        let (zone, rejected_zone) = LogZone::resolve(config.timezone.as_deref());
        let formatter = Formatter::new(zone, config.colorful_logs, Arc::clone(&clock));
        let gate = LevelGate::new(
            config.console_log_levels.clone(),
            config.log_file_levels.clone(),
        );
        let reporter = reporter.unwrap_or_else(|| {
            Arc::new(ConsoleReporter::new(
                formatter.clone(),
                gate.clone(),
                Arc::clone(&console),
            ))
        });

        let (writer, retention) = if config.write_logs_to_file {
            let runtime = Handle::try_current().ok();
            let dir = config.log_file_dir_path.clone();
            create_dir(&dir)?;

            let retention = if config.retention_enabled() {
                let archive_dir = config.archive_dir();
                if config.archive_logs {
                    create_dir(&archive_dir)?;
                }
                Some(RetentionManager::activate(
                    RetentionPolicy {
                        dir: dir.clone(),
                        archive_dir,
                        max_age: config.log_file_max_age,
                        archive: config.archive_logs,
                        interval: sweep_interval,
                    },
                    zone,
                    Arc::clone(&clock),
                    Arc::clone(&reporter),
                    runtime.clone(),
                ))
            } else {
                None
            };

            let writer = DiskWriter::new(
                dir,
                zone,
                Arc::clone(&clock),
                Arc::clone(&reporter),
                retention.as_ref().map(RetentionManager::handle),
                runtime,
            );
            (Some(writer), retention)
        } else {
            (None, None)
        };

        let logger = Logger {
            core: Arc::new(LoggerCore {
                formatter,
                gate,
                console,
                writer,
                retention,
            }),
            tag: None,
        };

        if let Some(name) = rejected_zone {
            logger.warn(format!(
                "Invalid server timezone \"{}\"! Timezone is set to \"{}\"",
                name,
                zone.name()
            ));
        }

        Ok(logger)
    }
}

fn create_dir(path: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| LoggerError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

struct LoggerCore {
    formatter: Formatter,
    gate: LevelGate,
    console: Arc<dyn ConsoleSink>,
    writer: Option<DiskWriter>,
    retention: Option<RetentionManager>,
}

/// Leveled logger writing to the console and to day files
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    tag: Option<Arc<str>>,
}

impl Logger {
    /// Build a logger with the default console, clock and reporter
    pub fn new(config: LoggerConfig) -> Result<Self> {
        LoggerBuilder::new(config).build()
    }

    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    /// A view of this logger whose lines all carry `tag`
    pub fn for_tag(&self, tag: impl Into<String>) -> Logger {
        Logger {
            core: Arc::clone(&self.core),
            tag: Some(Arc::from(tag.into())),
        }
    }

    /// Tag this view was created with
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn debug(&self, message: impl Into<Part>) {
        self.log(Level::Debug, &[message.into()]);
    }

    pub fn info(&self, message: impl Into<Part>) {
        self.log(Level::Info, &[message.into()]);
    }

    pub fn notice(&self, message: impl Into<Part>) {
        self.log(Level::Notice, &[message.into()]);
    }

    pub fn warn(&self, message: impl Into<Part>) {
        self.log(Level::Warn, &[message.into()]);
    }

    pub fn error(&self, message: impl Into<Part>) {
        self.log(Level::Error, &[message.into()]);
    }

    /// Write a multi-part record; see [`parts!`](crate::parts)
    pub fn log(&self, level: Level, parts: &[Part]) {
        let to_console = self.core.gate.allowed(SinkKind::Console, level);
        let to_file = self.core.writer.is_some() && self.core.gate.allowed(SinkKind::File, level);
        if !to_console && !to_file {
            return;
        }

        let line = self.core.formatter.render(level, parts, self.tag.as_deref());
        if to_console {
            self.core.console.print(level, &line);
        }
        if to_file {
            if let Some(writer) = &self.core.writer {
                writer.write(&line);
            }
        }
    }

    /// Write a record on behalf of a named component
    pub(crate) fn log_named(&self, name: &str, level: Level, parts: &[Part]) {
        let mut prefixed = Vec::with_capacity(parts.len() + 1);
        prefixed.push(Part::Text(self.name_prefix(name)));
        prefixed.extend_from_slice(parts);
        self.log(level, &prefixed);
    }

    fn name_prefix(&self, name: &str) -> String {
        let prefix = format!("[{}]", name);
        if self.core.formatter.colors() {
            prefix.dark_cyan().to_string()
        } else {
            prefix
        }
    }

    /// Whether `level` is enabled for `sink` by the configured level sets
    ///
    /// Does not look at `write_logs_to_file`; [`log`](Self::log) checks that
    /// separately.
    pub fn should_log(&self, sink: SinkKind, level: Level) -> bool {
        self.core.gate.allowed(sink, level)
    }

    /// Render a line exactly as this logger would, without writing it
    pub fn render(&self, level: Level, parts: &[Part], tag: Option<&str>) -> String {
        self.core.formatter.render(level, parts, tag)
    }

    /// Zone used for timestamps and day files
    pub fn zone(&self) -> LogZone {
        self.core.formatter.zone()
    }

    /// The disk writer, when file logging is enabled
    pub fn writer(&self) -> Option<&DiskWriter> {
        self.core.writer.as_ref()
    }

    /// The retention manager, when retention is active
    pub fn retention(&self) -> Option<&RetentionManager> {
        self.core.retention.as_ref()
    }

    /// Wait until every queued line has reached disk (or failed)
    pub async fn flush(&self) {
        if let Some(writer) = &self.core.writer {
            writer.flush().await;
        }
    }

    /// Blocking [`flush`](Self::flush) for code outside a runtime
    pub fn flush_blocking(&self) {
        if let Some(writer) = &self.core.writer {
            writer.flush_blocking();
        }
    }

    /// Stop background retention; writing keeps working
    pub fn shutdown(&self) {
        if let Some(retention) = &self.core.retention {
            retention.shutdown();
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("formatter", &self.core.formatter)
            .field("tag", &self.tag)
            .field("writes_to_file", &self.core.writer.is_some())
            .field("retention", &self.core.retention.is_some())
            .finish()
    }
}
