//! Console sink and the internal error side channel
//!
//! Nothing in this module may reach the disk writer: failures of the writer
//! are reported here, and reporting them to disk would loop forever.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::error::LoggerError;
use crate::format::{Formatter, Part};
use crate::level::{Level, LevelGate, SinkKind};

/// Destination for console output
pub trait ConsoleSink: Send + Sync + 'static {
    fn print(&self, level: Level, line: &str);
}

/// Process stdout/stderr; warnings and errors go to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl ConsoleSink for StdConsole {
    fn print(&self, level: Level, line: &str) {
        if level.is_alert() {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
        } else {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{}", line);
        }
    }
}

/// Console that keeps printed lines in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryConsole {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything printed so far, in order
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().map(|l| l.is_empty()).unwrap_or(true)
    }
}

impl ConsoleSink for MemoryConsole {
    fn print(&self, level: Level, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, line.to_string()));
        }
    }
}

/// Receiver for failures and maintenance notices raised off the caller's path
pub trait Reporter: Send + Sync + 'static {
    /// An asynchronous operation failed
    fn error(&self, error: LoggerError);

    /// Informational notice, e.g. a file was archived
    fn message(&self, message: &str);
}

/// Reports through the console only
///
/// Errors are always printed; notices only when debug is enabled for the
/// console.
pub struct ConsoleReporter {
    formatter: Formatter,
    gate: LevelGate,
    console: Arc<dyn ConsoleSink>,
}

impl ConsoleReporter {
    pub fn new(formatter: Formatter, gate: LevelGate, console: Arc<dyn ConsoleSink>) -> Self {
        Self {
            formatter,
            gate,
            console,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn error(&self, error: LoggerError) {
        let line = self
            .formatter
            .render(Level::Error, &[Part::from(&error)], None);
        self.console.print(Level::Error, &line);
    }

    fn message(&self, message: &str) {
        if self.gate.allowed(SinkKind::Console, Level::Debug) {
            let line = self.formatter.render(Level::Debug, &[Part::from(message)], None);
            self.console.print(Level::Debug, &line);
        }
    }
}

/// Reporter that records everything it receives
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    errors: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display strings of the reported errors
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Reporter for CollectingReporter {
    fn error(&self, error: LoggerError) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(error.to_string());
        }
    }

    fn message(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{LogZone, SystemClock};
    use crate::level::LevelSet;

    fn build_reporter(console_levels: LevelSet) -> (ConsoleReporter, MemoryConsole) {
        let console = MemoryConsole::new();
        let formatter = Formatter::new(LogZone::Local, false, Arc::new(SystemClock));
        let gate = LevelGate::new(console_levels, LevelSet::All);
        (
            ConsoleReporter::new(formatter, gate, Arc::new(console.clone())),
            console,
        )
    }

    #[test]
    fn test_errors_always_printed() {
        let (reporter, console) = build_reporter(LevelSet::none());
        reporter.error(LoggerError::WriteLog {
            filename: "01-01-2024.log".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });

        let lines = console.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Level::Error);
        assert!(lines[0].1.contains("ERROR  could not write log to file"));
        assert!(lines[0].1.ends_with("(permission denied)"));
    }

    #[test]
    fn test_messages_need_console_debug() {
        let (reporter, console) = build_reporter(LevelSet::only([Level::Info]));
        reporter.message("Log file \"x\" was deleted");
        assert!(console.is_empty());

        let (reporter, console) = build_reporter(LevelSet::All);
        reporter.message("Log file \"x\" was deleted");
        let lines = console.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.contains("DEBUG  Log file \"x\" was deleted"));
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::new();
        reporter.message("hi");
        reporter.error(LoggerError::Delete {
            filename: "a.log".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(reporter.messages(), vec!["hi".to_string()]);
        assert_eq!(reporter.errors().len(), 1);
    }
}
