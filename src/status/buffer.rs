//! In-memory status buffer
//!
//! A thread-safe ring of recent status notifications that a control surface
//! can poll, with warnings and errors also kept in a separate alert list.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::sink::{Severity, StatusSink};

/// A single status notification
#[derive(Debug, Clone)]
pub struct StatusEntry {
    /// When the notification was received
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl StatusEntry {
    /// Create a new status entry stamped with the current time
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        }
    }
}

/// Thread-safe bounded store of status notifications
pub struct StatusBuffer {
    entries: RwLock<VecDeque<StatusEntry>>,
    /// Warnings and errors only, until acknowledged
    alerts: RwLock<VecDeque<StatusEntry>>,
    max_entries: usize,
    max_alerts: usize,
}

impl StatusBuffer {
    /// Create a new status buffer with specified capacities
    pub fn new(max_entries: usize, max_alerts: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries)),
            alerts: RwLock::new(VecDeque::with_capacity(max_alerts)),
            max_entries,
            max_alerts,
        }
    }

    /// Push a new entry, evicting the oldest when full
    pub fn push(&self, entry: StatusEntry) {
        if entry.severity.is_alert() {
            if let Ok(mut alerts) = self.alerts.write() {
                if alerts.len() >= self.max_alerts {
                    alerts.pop_front();
                }
                alerts.push_back(entry.clone());
            }
        }

        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// Get all entries, oldest first
    pub fn all_entries(&self) -> Vec<StatusEntry> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent entry, if any
    pub fn latest(&self) -> Option<StatusEntry> {
        self.entries.read().ok().and_then(|e| e.back().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get pending alerts (warnings and errors)
    pub fn pending_alerts(&self) -> Vec<StatusEntry> {
        self.alerts
            .read()
            .map(|a| a.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.read().map(|a| a.len()).unwrap_or(0)
    }

    /// Clear all alerts (after they've been acknowledged)
    pub fn clear_alerts(&self) {
        if let Ok(mut alerts) = self.alerts.write() {
            alerts.clear();
        }
    }
}

impl StatusSink for StatusBuffer {
    fn notify(&self, message: &str, severity: Severity) {
        self.push(StatusEntry::new(severity, message));
    }
}
