//! `tracing` integration
//!
//! [`LoggerLayer`] forwards `tracing` events from the rest of the server into
//! a [`Logger`], so libraries instrumented with `tracing` end up in the same
//! console and day files. Events emitted by this crate are skipped: the
//! writer and retention manager report through `tracing` themselves and must
//! never feed back into the writer.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::format::Part;
use crate::level::{Level, SinkKind};
use crate::logger::Logger;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// `tracing_subscriber` layer writing events into a [`Logger`]
#[derive(Debug, Clone)]
pub struct LoggerLayer {
    logger: Logger,
}

impl LoggerLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

/// Collects the message and the remaining fields as `key=value`
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl EventVisitor {
    fn into_text(self) -> String {
        let mut text = self.message.unwrap_or_default();
        for field in self.fields {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&field);
        }
        text
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for LoggerLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(OWN_TARGET) {
            return;
        }

        let level = Level::from(*metadata.level());
        if !self.logger.should_log(SinkKind::Console, level)
            && !self.logger.should_log(SinkKind::File, level)
        {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.logger.log(level, &[Part::Text(visitor.into_text())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggerConfig;
    use crate::console::MemoryConsole;
    use crate::level::LevelSet;
    use tracing_subscriber::layer::SubscriberExt;

    fn console_logger(levels: LevelSet) -> (Logger, MemoryConsole) {
        let console = MemoryConsole::new();
        let config = LoggerConfig {
            colorful_logs: false,
            write_logs_to_file: false,
            console_log_levels: levels,
            ..Default::default()
        };
        let log = Logger::builder(config)
            .console(console.clone())
            .build()
            .unwrap();
        (log, console)
    }

    #[test]
    fn test_events_are_forwarded() {
        let (log, console) = console_logger(LevelSet::only([Level::Info, Level::Warn]));
        let subscriber = tracing_subscriber::registry().with(LoggerLayer::new(log));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "server::auth", user = 7, route = "/login", "signed in");
            tracing::trace!(target: "server::auth", "too quiet");
            tracing::warn!(target: "server", "careful");
        });

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].1.ends_with("INFO   signed in user=7 route=/login"));
        assert_eq!(lines[1].0, Level::Warn);
        assert!(lines[1].1.ends_with("WARN   careful"));
    }

    #[test]
    fn test_trace_maps_to_debug() {
        let (log, console) = console_logger(LevelSet::All);
        let subscriber = tracing_subscriber::registry().with(LoggerLayer::new(log));

        tracing::subscriber::with_default(subscriber, || {
            tracing::trace!(target: "server::router", "route matched");
        });

        let lines = console.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.ends_with("DEBUG  route matched"));
    }

    #[test]
    fn test_own_events_are_ignored() {
        let (log, console) = console_logger(LevelSet::All);
        let subscriber = tracing_subscriber::registry().with(LoggerLayer::new(log));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "singular_logger::disk::retention", "log retention activated");
        });

        assert!(console.is_empty());
    }
}
