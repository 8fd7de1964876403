//! Per-channel file state
//!
//! Each channel owns at most one open writer. The writer and the path it
//! writes to only change while the channel's mutex is held.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::factory::{LogFile, OpenLogFile};

/// One of the two independent logging streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Positioning,
    Motion,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 2] = [ChannelKind::Positioning, ChannelKind::Motion];

    /// Tag used in file names
    pub fn name_prefix(&self) -> &'static str {
        match self {
            ChannelKind::Positioning => "gps",
            ChannelKind::Motion => "imu",
        }
    }

    /// Short label used in status messages
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::Positioning => "GPS",
            ChannelKind::Motion => "IMU",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable state of a channel, only reachable through [`Channel::lock`]
#[derive(Default)]
pub(crate) struct ChannelState {
    writer: Option<BufWriter<File>>,
    file: Option<LogFile>,
    records_written: u64,
}

impl ChannelState {
    pub(crate) fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    pub(crate) fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Take ownership of a freshly created file
    ///
    /// The caller must have closed any previous writer.
    pub(crate) fn install(&mut self, open: OpenLogFile) {
        debug_assert!(self.writer.is_none());
        self.writer = Some(open.writer);
        self.file = Some(open.file);
        self.records_written = 0;
    }

    /// Write a comment line that does not count as a record
    pub(crate) fn write_comment(&mut self, line: &str) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writeln!(writer, "{}", line),
            None => Ok(()),
        }
    }

    /// Append one record line; returns `false` if the channel is closed
    pub(crate) fn write_record(&mut self, line: &str) -> io::Result<bool> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(false);
        };
        writeln!(writer, "{}", line)?;
        self.records_written += 1;
        Ok(true)
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Flush and release the writer
    ///
    /// The handle is released and the state reset even when the flush fails.
    /// Returns the path of the file that was closed.
    pub(crate) fn close(&mut self) -> io::Result<Option<PathBuf>> {
        let path = self.file.take().map(|f| f.path);
        match self.writer.take() {
            Some(writer) => match writer.into_inner() {
                Ok(_file) => Ok(path),
                Err(e) => {
                    let (error, writer) = e.into_parts();
                    // Records still buffered are lost with the handle
                    let (_file, _unflushed) = writer.into_parts();
                    Err(error)
                }
            },
            None => Ok(None),
        }
    }
}

/// A logging channel guarded by its own lock
pub struct Channel {
    kind: ChannelKind,
    state: Mutex<ChannelState>,
}

impl Channel {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            state: Mutex::new(ChannelState::default()),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Acquire the channel lock
    ///
    /// A panic while the lock was held leaves the state usable, so poisoning
    /// is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
