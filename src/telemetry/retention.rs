//! Log file retention
//!
//! Removes log files that are too small to be useful (aborted or empty
//! sessions) and, optionally, the oldest files once the directory holds more
//! than a configured number of them. Files backing an open channel are never
//! touched.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

use crate::config::{MAX_FILES_STORED, MINIMUM_USABLE_FILE_SIZE_BYTES};

/// Limits applied by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Ceiling on stored files for the count pass
    pub max_files: usize,
    /// Files strictly smaller than this are removed
    pub min_usable_bytes: u64,
    /// Whether to evict oldest files beyond `max_files`
    pub evict_by_count: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES_STORED,
            min_usable_bytes: MINIMUM_USABLE_FILE_SIZE_BYTES,
            evict_by_count: true,
        }
    }
}

/// Number of files removed by each pass of a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub undersized: usize,
    pub evicted: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.undersized + self.evicted
    }
}

struct Candidate {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

/// Remove undersized and excess files from `base_dir`
///
/// `retained` lists the files currently open; they survive regardless of
/// size or age. Subdirectories are left alone.
pub fn sweep(base_dir: &Path, retained: &[PathBuf], policy: &RetentionPolicy) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    if !base_dir.exists() {
        return Ok(report);
    }

    let mut remaining = Vec::new();
    let mut retained_count = 0;

    for entry in fs::read_dir(base_dir)
        .with_context(|| format!("Failed to read {}", base_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        if is_retained(&path, retained) {
            retained_count += 1;
            continue;
        }

        if metadata.len() < policy.min_usable_bytes {
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), bytes = metadata.len(), "Removed undersized log file");
                    report.undersized += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove log file");
                }
            }
            continue;
        }

        remaining.push(Candidate {
            path,
            len: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    if policy.evict_by_count {
        report.evicted = evict_oldest(remaining, retained_count, policy.max_files);
    }

    Ok(report)
}

/// Delete the oldest candidates until at most `max_files` files remain
fn evict_oldest(mut candidates: Vec<Candidate>, retained_count: usize, max_files: usize) -> usize {
    let total = candidates.len() + retained_count;
    if total <= max_files {
        return 0;
    }

    candidates.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

    let excess = total - max_files;
    let mut evicted = 0;
    for candidate in candidates.iter().take(excess) {
        match fs::remove_file(&candidate.path) {
            Ok(()) => {
                tracing::debug!(path = %candidate.path.display(), bytes = candidate.len, "Evicted old log file");
                evicted += 1;
            }
            Err(e) => {
                tracing::warn!(path = %candidate.path.display(), error = %e, "Failed to evict log file");
            }
        }
    }
    evicted
}

fn is_retained(path: &Path, retained: &[PathBuf]) -> bool {
    retained.iter().any(|r| r == path)
}
