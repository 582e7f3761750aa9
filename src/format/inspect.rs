//! Readable rendering of structured message parts
//!
//! Produces the compact `{ key: 'value', list: [ 1, 2 ] }` notation. Anything
//! nested deeper than [`MAX_DEPTH`] collapses to `[Object]` or `[Array]` so a
//! single log line stays bounded.

use crossterm::style::Stylize;
use serde_json::Value;

/// Deepest nesting level that is still expanded
pub const MAX_DEPTH: usize = 2;

/// Render a value, optionally colorizing scalars
pub fn inspect(value: &Value, colors: bool) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0, colors);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize, colors: bool) {
    match value {
        Value::Null => push_scalar(out, "null".to_string(), colors, |s| s.bold().to_string()),
        Value::Bool(b) => push_scalar(out, b.to_string(), colors, |s| s.dark_yellow().to_string()),
        Value::Number(n) => push_scalar(out, n.to_string(), colors, |s| s.dark_yellow().to_string()),
        Value::String(s) => push_scalar(out, quote(s), colors, |s| s.dark_green().to_string()),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
            } else if depth > MAX_DEPTH {
                push_scalar(out, "[Array]".to_string(), colors, |s| s.dark_cyan().to_string());
            } else {
                out.push_str("[ ");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_value(out, item, depth + 1, colors);
                }
                out.push_str(" ]");
            }
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
            } else if depth > MAX_DEPTH {
                push_scalar(out, "[Object]".to_string(), colors, |s| s.dark_cyan().to_string());
            } else {
                out.push_str("{ ");
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&object_key(key));
                    out.push_str(": ");
                    write_value(out, item, depth + 1, colors);
                }
                out.push_str(" }");
            }
        }
    }
}

fn push_scalar(out: &mut String, text: String, colors: bool, paint: impl Fn(String) -> String) {
    if colors {
        out.push_str(&paint(text));
    } else {
        out.push_str(&text);
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Keys that are plain identifiers are printed bare, everything else quoted
fn object_key(key: &str) -> String {
    let mut chars = key.chars();
    let is_identifier = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if is_identifier {
        key.to_string()
    } else {
        quote(key)
    }
}
