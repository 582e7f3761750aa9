//! Error types for the logger

use std::io;
use std::path::PathBuf;

/// Result type for logger construction
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Failures raised by the logger
///
/// Only [`LoggerError::CreateDirectory`] is ever returned to a caller; the
/// rest travel through a [`Reporter`](crate::console::Reporter).
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// The log or archive directory could not be created
    #[error("could not create log directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    /// A queued line could not be appended
    #[error("could not write log to file \"{filename}\": {source}")]
    WriteLog { filename: String, source: io::Error },

    /// The log directory could not be scanned
    #[error("could not read log directory {path}: {source}")]
    ReadLogDirectory { path: PathBuf, source: io::Error },

    /// Compressing or relocating an expired file failed
    #[error("could not archive log file \"{filename}\": {source}")]
    Archive { filename: String, source: io::Error },

    /// Removing an expired file failed
    #[error("could not delete log file \"{filename}\": {source}")]
    Delete { filename: String, source: io::Error },
}

impl LoggerError {
    /// Underlying io error
    pub fn io_source(&self) -> &io::Error {
        match self {
            LoggerError::CreateDirectory { source, .. }
            | LoggerError::WriteLog { source, .. }
            | LoggerError::ReadLogDirectory { source, .. }
            | LoggerError::Archive { source, .. }
            | LoggerError::Delete { source, .. } => source,
        }
    }
}

/// Rough cause of a disk failure, used to hint at the fix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    DiskFull,
    PermissionDenied,
    NotFound,
    Other,
}

// ENOSPC, EDQUOT on Linux and macOS
#[cfg(unix)]
const NO_SPACE_CODES: [i32; 3] = [28, 122, 69];

impl DiskErrorKind {
    /// Classify by error kind, then by raw OS code for kinds std reports as uncategorized
    pub fn of(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::StorageFull | io::ErrorKind::WriteZero => Self::DiskFull,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            #[cfg(unix)]
            _ if error
                .raw_os_error()
                .is_some_and(|code| NO_SPACE_CODES.contains(&code)) =>
            {
                Self::DiskFull
            }
            _ => Self::Other,
        }
    }

    /// Short hint appended to reports
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::DiskFull => Some("disk full"),
            Self::PermissionDenied => Some("permission denied"),
            Self::NotFound => Some("file or directory not found"),
            Self::Other => None,
        }
    }
}

/// Error message with a disk category hint when one applies
pub fn describe(error: &LoggerError) -> String {
    match DiskErrorKind::of(error.io_source()).hint() {
        Some(hint) => format!("{} ({})", error, hint),
        None => error.to_string(),
    }
}
