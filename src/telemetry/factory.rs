//! Log file creation
//!
//! Builds timestamp-named files under `<storage root>/pseudoranges` after
//! checking that the storage medium is writable.

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::FILE_PREFIX;
use crate::error::LoggerError;
use crate::storage::{StorageMedium, StorageState};

const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// A log file created for one channel of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    /// Channel tag used in the file name ("gps" or "imu")
    pub name_prefix: String,
    pub created_at: DateTime<Local>,
}

/// A freshly created file together with its writer
pub struct OpenLogFile {
    pub file: LogFile,
    pub writer: BufWriter<File>,
}

/// Build the file name for a channel and creation time
///
/// Names have one-second granularity; two files for the same channel created
/// within the same second share a name.
pub fn log_file_name(name_prefix: &str, at: &DateTime<Local>) -> String {
    format!(
        "{}_{}_log_{}.txt",
        FILE_PREFIX,
        name_prefix,
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Creates channel files on a storage medium
#[derive(Clone)]
pub struct FileFactory {
    storage: Arc<dyn StorageMedium>,
    base_dir: PathBuf,
}

impl FileFactory {
    pub fn new(storage: Arc<dyn StorageMedium>) -> Self {
        let base_dir = storage.root().join(FILE_PREFIX);
        Self { storage, base_dir }
    }

    /// Directory that holds every log file
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a new file named after the current wall-clock time
    pub fn create_file(&self, name_prefix: &str) -> Result<OpenLogFile, LoggerError> {
        self.create_file_at(name_prefix, Local::now())
    }

    /// Create a new file named after `at`
    ///
    /// An existing file with the same name is truncated.
    pub fn create_file_at(
        &self,
        name_prefix: &str,
        at: DateTime<Local>,
    ) -> Result<OpenLogFile, LoggerError> {
        match self.storage.state() {
            StorageState::Writable => {}
            StorageState::ReadOnly => return Err(LoggerError::StorageReadOnly),
            StorageState::Unavailable => return Err(LoggerError::StorageUnavailable),
        }

        fs::create_dir_all(&self.base_dir).map_err(|source| LoggerError::FileOpenFailed {
            path: self.base_dir.clone(),
            source,
        })?;

        let path = self.base_dir.join(log_file_name(name_prefix, &at));
        let handle = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| LoggerError::FileOpenFailed {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Created log file");

        Ok(OpenLogFile {
            file: LogFile {
                path,
                name_prefix: name_prefix.to_string(),
                created_at: at,
            },
            writer: BufWriter::new(handle),
        })
    }
}
