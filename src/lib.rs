//! Singular logger - day-file structured logging for the Singular server
//!
//! Records at five severities are rendered once and sent to the console and,
//! through an ordered background writer, to one log file per calendar day.
//! Old day files are archived (gzip) or deleted by a retention manager that
//! runs on its own timer.
//!
//! ```no_run
//! use singular_logger::{parts, Level, Logger, LoggerConfig};
//!
//! # async fn run() -> Result<(), singular_logger::LoggerError> {
//! let log = Logger::new(LoggerConfig::default())?;
//! log.info("server started");
//! log.for_tag("session-42").log(Level::Warn, &parts!["slow request", 812, "ms"]);
//! log.flush().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod clock;
pub mod config;
pub mod console;
pub mod disk;
pub mod error;
pub mod format;
pub mod level;
pub mod logger;
pub mod named;
pub mod pending;

pub use bridge::LoggerLayer;
pub use clock::{Clock, LogZone, ManualClock, SystemClock};
pub use config::LoggerConfig;
pub use console::{CollectingReporter, ConsoleSink, MemoryConsole, Reporter, StdConsole};
pub use error::{LoggerError, Result};
pub use format::{Formatter, Part};
pub use level::{Level, LevelSet, SinkKind};
pub use logger::{Logger, LoggerBuilder};
pub use named::NamedLogger;
pub use pending::{PendingLog, PendingLogs};
