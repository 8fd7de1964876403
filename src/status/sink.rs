//! Status sink trait and the tracing-backed implementation

/// Severity of a status notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Get the display name for this severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Check if this severity should be surfaced as an alert
    pub fn is_alert(&self) -> bool {
        matches!(self, Severity::Warning | Severity::Error)
    }
}

/// Receiver of human-readable status notifications
///
/// Implementations must not block for long: `notify` may be called while a
/// channel lock is held.
pub trait StatusSink: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

impl<F> StatusSink for F
where
    F: Fn(&str, Severity) + Send + Sync,
{
    fn notify(&self, message: &str, severity: Severity) {
        self(message, severity)
    }
}

/// Sink that forwards every notification to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => tracing::info!(target: "gnsslog::status", "{}", message),
            Severity::Warning => tracing::warn!(target: "gnsslog::status", "{}", message),
            Severity::Error => tracing::error!(target: "gnsslog::status", "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |message: &str, severity: Severity| {
            seen.lock().unwrap().push((message.to_string(), severity));
        };
        sink.notify("GPS File opened", Severity::Info);
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec![("GPS File opened".to_string(), Severity::Info)]);
    }

    #[test]
    fn test_severity_is_alert() {
        assert!(!Severity::Info.is_alert());
        assert!(Severity::Warning.is_alert());
        assert!(Severity::Error.is_alert());
    }
}
