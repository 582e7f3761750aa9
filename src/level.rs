//! Log levels and per-sink level gating

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warn,
    Error,
}

impl Level {
    /// All levels, lowest severity first
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warn,
        Level::Error,
    ];

    /// Lowercase config name
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }

    /// Upper-cased label used in rendered lines
    pub fn label(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Whether console output for this level belongs on stderr
    pub fn is_alert(&self) -> bool {
        matches!(self, Level::Warn | Level::Error)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown log level \"{}\"", s))
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Destination a rendered line can be sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    File,
}

/// Levels permitted for one sink: either everything or an explicit allow-list
///
/// Serialized as the literal string `"all"` or a list of level names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLevelSet", into = "RawLevelSet")]
pub enum LevelSet {
    All,
    Only(HashSet<Level>),
}

impl LevelSet {
    /// Build an explicit allow-list
    pub fn only(levels: impl IntoIterator<Item = Level>) -> Self {
        LevelSet::Only(levels.into_iter().collect())
    }

    /// An allow-list that permits nothing
    pub fn none() -> Self {
        LevelSet::Only(HashSet::new())
    }

    /// Check membership
    pub fn contains(&self, level: Level) -> bool {
        match self {
            LevelSet::All => true,
            LevelSet::Only(levels) => levels.contains(&level),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawLevelSet {
    Keyword(String),
    Levels(Vec<Level>),
}

impl TryFrom<RawLevelSet> for LevelSet {
    type Error = String;

    fn try_from(raw: RawLevelSet) -> Result<Self, Self::Error> {
        match raw {
            RawLevelSet::Keyword(keyword) if keyword == "all" => Ok(LevelSet::All),
            RawLevelSet::Keyword(other) => Err(format!(
                "expected \"all\" or a list of levels, got \"{}\"",
                other
            )),
            RawLevelSet::Levels(levels) => Ok(LevelSet::only(levels)),
        }
    }
}

impl From<LevelSet> for RawLevelSet {
    fn from(set: LevelSet) -> Self {
        match set {
            LevelSet::All => RawLevelSet::Keyword("all".to_string()),
            LevelSet::Only(levels) => {
                let mut levels: Vec<Level> = levels.into_iter().collect();
                levels.sort();
                RawLevelSet::Levels(levels)
            }
        }
    }
}

/// Decides per sink whether a level may be written
#[derive(Debug, Clone)]
pub struct LevelGate {
    console: LevelSet,
    file: LevelSet,
}

impl LevelGate {
    pub fn new(console: LevelSet, file: LevelSet) -> Self {
        Self { console, file }
    }

    /// Whether `level` may be written to `sink`
    pub fn allowed(&self, sink: SinkKind, level: Level) -> bool {
        match sink {
            SinkKind::Console => self.console.contains(level),
            SinkKind::File => self.file.contains(level),
        }
    }
}
