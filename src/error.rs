//! Error types for the telemetry logger
//!
//! Every file-system failure on the logging path maps to one [`LoggerError`]
//! variant. Errors are reported once to the status sink where they happen and
//! returned to the caller, who is free to ignore them.

use std::io;
use std::path::PathBuf;

use crate::telemetry::ChannelKind;

/// Failures of the dual-channel logger
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("Cannot read external storage.")]
    StorageUnavailable,

    #[error("Cannot write to external storage.")]
    StorageReadOnly,

    #[error("Could not open file: {}", .path.display())]
    FileOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Problem writing to {channel} file.")]
    WriteFailed {
        channel: ChannelKind,
        #[source]
        source: io::Error,
    },

    #[error("Unable to close {channel} file stream.")]
    CloseFailed {
        channel: ChannelKind,
        #[source]
        source: io::Error,
    },

    #[error("Malformed {channel} record: {reason}")]
    FormatError {
        channel: ChannelKind,
        reason: String,
    },

    #[error("{channel} file already open: {}", .path.display())]
    AlreadyOpen { channel: ChannelKind, path: PathBuf },
}

impl LoggerError {
    /// Underlying I/O error, if any
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            LoggerError::FileOpenFailed { source, .. }
            | LoggerError::WriteFailed { source, .. }
            | LoggerError::CloseFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Message suitable for the status sink
    ///
    /// I/O failures get their cause categorized, so a full disk reads as such.
    pub fn user_message(&self) -> String {
        match self.io_source() {
            Some(e) => friendly_io_error_message(e, &self.to_string()),
            None => self.to_string(),
        }
    }
}

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "storage full",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "I/O error",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC and EDQUOT (122 on Linux, 69 on macOS)
                    if os_error == libc::ENOSPC || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    if os_error == libc::EACCES || os_error == libc::EROFS {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Create a user-friendly error message from an IO error
pub fn friendly_io_error_message(e: &io::Error, context: &str) -> String {
    match categorize_io_error(e) {
        DiskErrorKind::Other => format!("{} ({})", context, e),
        kind => format!("{} ({})", context, kind.user_message()),
    }
}
