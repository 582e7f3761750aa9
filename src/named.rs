//! Component-scoped logger
//!
//! Prefixes every message with `[name]`. Until a [`Logger`] is attached the
//! records go to a [`PendingLogs`] buffer.

use std::sync::Arc;

use crate::format::Part;
use crate::level::Level;
use crate::logger::Logger;
use crate::pending::{PendingLog, PendingLogs};

#[derive(Clone)]
enum Target {
    Live(Logger),
    Pending(Arc<PendingLogs>),
}

/// Logger handed to a named component such as a plugin
#[derive(Clone)]
pub struct NamedLogger {
    name: Arc<str>,
    target: Target,
}

impl NamedLogger {
    /// Log straight into a running logger
    pub fn attached(name: impl Into<String>, logger: &Logger) -> Self {
        Self {
            name: Arc::from(name.into()),
            target: Target::Live(logger.clone()),
        }
    }

    /// Log into a buffer that is replayed once the logger exists
    pub fn pending(name: impl Into<String>, buffer: Arc<PendingLogs>) -> Self {
        Self {
            name: Arc::from(name.into()),
            target: Target::Pending(buffer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether records go to a live logger
    pub fn is_attached(&self) -> bool {
        matches!(self.target, Target::Live(_))
    }

    pub fn debug(&self, message: impl Into<Part>) {
        self.log(Level::Debug, vec![message.into()]);
    }

    pub fn info(&self, message: impl Into<Part>) {
        self.log(Level::Info, vec![message.into()]);
    }

    pub fn notice(&self, message: impl Into<Part>) {
        self.log(Level::Notice, vec![message.into()]);
    }

    pub fn warn(&self, message: impl Into<Part>) {
        self.log(Level::Warn, vec![message.into()]);
    }

    pub fn error(&self, message: impl Into<Part>) {
        self.log(Level::Error, vec![message.into()]);
    }

    pub fn log(&self, level: Level, parts: Vec<Part>) {
        match &self.target {
            Target::Live(logger) => logger.log_named(&self.name, level, &parts),
            Target::Pending(buffer) => {
                buffer.push(PendingLog::new(level, parts).from_source(&*self.name))
            }
        }
    }
}

impl std::fmt::Debug for NamedLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedLogger")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .finish()
    }
}
