//! Buffer for records produced before the logger exists
//!
//! Components installed during server startup log before the configuration
//! is loaded. Their records are held here and replayed, in order, into the
//! logger once it has been built.

use std::collections::VecDeque;
use std::sync::RwLock;

use crate::format::Part;
use crate::level::Level;
use crate::logger::Logger;

/// Default number of records kept before the oldest are dropped
pub const DEFAULT_PENDING_CAPACITY: usize = 1_000;

/// A record waiting for the logger
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLog {
    pub level: Level,
    /// Component that produced the record
    pub source: Option<String>,
    pub parts: Vec<Part>,
}

impl PendingLog {
    pub fn new(level: Level, parts: Vec<Part>) -> Self {
        Self {
            level,
            source: None,
            parts,
        }
    }

    /// Attribute the record to a named component
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Thread-safe bounded FIFO of pending records
#[derive(Debug)]
pub struct PendingLogs {
    entries: RwLock<VecDeque<PendingLog>>,
    max_entries: usize,
}

impl PendingLogs {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(64))),
            max_entries,
        }
    }

    /// Queue a record, dropping the oldest one when full
    pub fn push(&self, entry: PendingLog) {
        if self.max_entries == 0 {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the queued records
    pub fn entries(&self) -> Vec<PendingLog> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return everything queued
    pub fn take(&self) -> Vec<PendingLog> {
        self.entries
            .write()
            .map(|mut e| e.drain(..).collect())
            .unwrap_or_default()
    }

    /// Write every queued record to `logger`, oldest first
    ///
    /// Returns the number of records replayed.
    pub fn replay_into(&self, logger: &Logger) -> usize {
        let entries = self.take();
        for entry in &entries {
            match &entry.source {
                Some(source) => logger.log_named(source, entry.level, &entry.parts),
                None => logger.log(entry.level, &entry.parts),
            }
        }
        entries.len()
    }
}

impl Default for PendingLogs {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggerConfig;
    use crate::console::MemoryConsole;
    use crate::level::LevelSet;
    use crate::parts;

    #[test]
    fn test_pending_push_and_take() {
        let pending = PendingLogs::new(100);
        pending.push(PendingLog::new(Level::Debug, parts!["Service installed"]));
        pending.push(PendingLog::new(Level::Error, parts!["Plugin failed"]).from_source("auth"));

        assert_eq!(pending.len(), 2);
        let entries = pending.entries();
        assert_eq!(entries[1].source.as_deref(), Some("auth"));

        assert_eq!(pending.take().len(), 2);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_pending_capacity() {
        let pending = PendingLogs::new(3);
        for i in 0..5 {
            pending.push(PendingLog::new(Level::Info, parts![format!("msg {}", i)]));
        }

        let entries = pending.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].parts, parts!["msg 2"]);
        assert_eq!(entries[2].parts, parts!["msg 4"]);
    }

    #[test]
    fn test_replay_in_order() {
        let console = MemoryConsole::new();
        let config = LoggerConfig {
            colorful_logs: false,
            write_logs_to_file: false,
            console_log_levels: LevelSet::All,
            ..Default::default()
        };
        let log = Logger::builder(config)
            .console(console.clone())
            .build()
            .unwrap();

        let pending = PendingLogs::default();
        pending.push(PendingLog::new(Level::Debug, parts!["Router \"users\" installed"]));
        pending.push(PendingLog::new(Level::Warn, parts!["slow start"]).from_source("metrics"));

        assert_eq!(pending.replay_into(&log), 2);
        assert!(pending.is_empty());

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].1.ends_with("DEBUG  Router \"users\" installed"));
        assert!(lines[1].1.ends_with("WARN   [metrics] slow start"));
    }
}
