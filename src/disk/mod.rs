//! On-disk log files
//!
//! One file per calendar day, named `DD-MM-YYYY.log`. The writer appends to
//! the current day's file; the retention manager archives or deletes files
//! once they are old enough.

mod archive;
mod retention;
mod writer;

use chrono::NaiveDate;

pub use archive::compress_file;
pub use retention::{
    RetentionHandle, RetentionManager, RetentionPolicy, TrackedLogFile, DEFAULT_SWEEP_INTERVAL,
};
pub use writer::DiskWriter;

/// Date pattern of day file names
pub const DAY_FILE_DATE_FORMAT: &str = "%d-%m-%Y";

/// Extension of day files
pub const DAY_FILE_EXTENSION: &str = ".log";

/// Native line terminator
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// File name for a calendar day
pub fn day_filename(date: NaiveDate) -> String {
    format!("{}{}", date.format(DAY_FILE_DATE_FORMAT), DAY_FILE_EXTENSION)
}

/// Parse a day file name back into its date
///
/// Only names of the exact form `DD-MM-YYYY.log` with a real calendar date
/// are accepted.
pub fn parse_day_filename(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(DAY_FILE_EXTENSION)?;
    let bytes = stem.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        2 | 5 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(stem, DAY_FILE_DATE_FORMAT).ok()
}
