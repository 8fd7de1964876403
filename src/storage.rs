//! Storage medium availability
//!
//! The file factory asks a [`StorageMedium`] whether it may write before it
//! creates anything.

use std::path::{Path, PathBuf};

/// Mount state of the storage medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    Writable,
    ReadOnly,
    Unavailable,
}

/// A storage medium that log files are written to
pub trait StorageMedium: Send + Sync {
    /// Current mount state
    fn state(&self) -> StorageState;

    /// Root directory of the medium
    fn root(&self) -> &Path;
}

/// Storage backed by a plain directory on the local file system
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageMedium for DirectoryStorage {
    fn state(&self) -> StorageState {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {
                if is_writable(&self.root, &meta) {
                    StorageState::Writable
                } else {
                    StorageState::ReadOnly
                }
            }
            _ => StorageState::Unavailable,
        }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(unix)]
fn is_writable(path: &Path, _meta: &std::fs::Metadata) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(_path: &Path, meta: &std::fs::Metadata) -> bool {
    !meta.permissions().readonly()
}
