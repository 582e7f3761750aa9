//! Line rendering
//!
//! Turns a level, message parts and an optional tag into a single line:
//!
//! ```text
//! [09-03-2024 14:30:45:123] <session-1> INFO   user signed in { id: 7 }
//! ```

mod inspect;

use std::sync::Arc;

use crossterm::style::{Color, Stylize};
use serde::Serialize;
use serde_json::Value;

use crate::clock::{Clock, LogZone};
use crate::level::Level;

pub use inspect::{inspect, MAX_DEPTH};

/// Display pattern for line timestamps
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S:%3f";

/// Width the level label is padded to
pub const LEVEL_WIDTH: usize = 6;

/// One renderable piece of a log message
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Printed verbatim
    Text(String),
    /// Printed in inspect notation
    Value(Value),
}

impl Part {
    /// Convert any serializable value into a structured part
    ///
    /// Values that fail to serialize are rendered through their error message.
    pub fn inspect<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Part::Value(value),
            Err(e) => Part::Text(format!("[unserializable: {}]", e)),
        }
    }

    fn render(&self, colors: bool) -> String {
        match self {
            Part::Text(text) => text.clone(),
            // Scalars at the top level read like text
            Part::Value(Value::String(s)) => s.clone(),
            Part::Value(Value::Null) => "null".to_string(),
            Part::Value(Value::Bool(b)) => b.to_string(),
            Part::Value(Value::Number(n)) => n.to_string(),
            Part::Value(value) => inspect(value, colors),
        }
    }
}

impl From<&str> for Part {
    fn from(text: &str) -> Self {
        Part::Text(text.to_string())
    }
}

impl From<String> for Part {
    fn from(text: String) -> Self {
        Part::Text(text)
    }
}

impl From<&String> for Part {
    fn from(text: &String) -> Self {
        Part::Text(text.clone())
    }
}

impl From<Value> for Part {
    fn from(value: Value) -> Self {
        Part::Value(value)
    }
}

macro_rules! part_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Part {
                fn from(value: $ty) -> Self {
                    Part::Text(value.to_string())
                }
            }
        )*
    };
}

part_from_display!(bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<&anyhow::Error> for Part {
    fn from(error: &anyhow::Error) -> Self {
        Part::Text(format!("{:#}", error))
    }
}

impl From<&crate::error::LoggerError> for Part {
    fn from(error: &crate::error::LoggerError) -> Self {
        Part::Text(crate::error::describe(error))
    }
}

/// Build a `Vec<Part>` from heterogeneous values
///
/// ```
/// use singular_logger::parts;
/// let parts = parts!["request took", 42, "ms"];
/// assert_eq!(parts.len(), 3);
/// ```
#[macro_export]
macro_rules! parts {
    ($($part:expr),* $(,)?) => {
        vec![$($crate::Part::from($part)),*]
    };
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Debug => Color::DarkGrey,
        Level::Info => Color::Grey,
        Level::Notice => Color::Blue,
        Level::Warn => Color::DarkYellow,
        Level::Error => Color::Red,
    }
}

/// Renders log lines for one logger configuration
#[derive(Clone)]
pub struct Formatter {
    zone: LogZone,
    colors: bool,
    clock: Arc<dyn Clock>,
}

impl Formatter {
    pub fn new(zone: LogZone, colors: bool, clock: Arc<dyn Clock>) -> Self {
        Self {
            zone,
            colors,
            clock,
        }
    }

    /// Whether rendered lines carry ANSI colors
    pub fn colors(&self) -> bool {
        self.colors
    }

    /// Zone timestamps are rendered in
    pub fn zone(&self) -> LogZone {
        self.zone
    }

    /// Render a record into one line
    pub fn render(&self, level: Level, parts: &[Part], tag: Option<&str>) -> String {
        let timestamp = format!(
            "[{}]",
            self.zone
                .localize(self.clock.now())
                .format(TIMESTAMP_FORMAT)
        );
        let label = format!("{:<width$}", level.label(), width = LEVEL_WIDTH);
        let message = parts
            .iter()
            .map(|part| part.render(self.colors))
            .collect::<Vec<_>>()
            .join(" ");

        let mut line = String::new();
        if self.colors {
            let color = level_color(level);
            line.push_str(&timestamp.green().to_string());
            line.push(' ');
            if let Some(tag) = tag {
                line.push_str(&format!("<{}>", tag).dark_magenta().to_string());
                line.push(' ');
            }
            line.push_str(&label.with(color).bold().to_string());
            line.push(' ');
            line.push_str(&message.with(color).to_string());
        } else {
            line.push_str(&timestamp);
            line.push(' ');
            if let Some(tag) = tag {
                line.push('<');
                line.push_str(tag);
                line.push_str("> ");
            }
            line.push_str(&label);
            line.push(' ');
            line.push_str(&message);
        }
        line
    }
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("zone", &self.zone)
            .field("colors", &self.colors)
            .finish()
    }
}

/// Remove ANSI escape sequences from a rendered line
pub fn strip_colors(line: &str) -> String {
    strip_ansi_escapes::strip_str(line)
}
