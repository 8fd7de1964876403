//! Dual-channel telemetry logger
//!
//! [`TelemetryLogger`] writes positioning fixes and motion-sensor samples to
//! two separate text files. Producers may call the append paths from any
//! thread while a control thread starts and stops sessions.
//!
//! Locking:
//! - each channel has its own mutex; appends only ever take one of them, so
//!   the two streams never block each other
//! - a control mutex serializes `start`, `stop` and `sweep`, and is always
//!   taken before a channel mutex, so a sweep's view of the open files cannot
//!   go stale while it deletes
//! - the status sink is only called with no channel lock held, so it may read
//!   `status()` or `retained_paths()`; it must not call `start`, `stop` or
//!   `sweep`

mod channel;
mod event;
mod factory;
pub mod format;
mod retention;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::LoggerError;
use crate::status::{Severity, StatusSink};

use channel::ChannelState;

pub use channel::{Channel, ChannelKind};
pub use event::{MotionSample, PositionFix, SensorType, GPS_PROVIDER};
pub use factory::{log_file_name, FileFactory, LogFile, OpenLogFile};
pub use retention::{sweep, RetentionPolicy, SweepReport};

/// What `start` does with a channel that is already open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReopenPolicy {
    /// Flush and close the open file, then open a new one
    #[default]
    Rotate,
    /// Keep the open file and fail with [`LoggerError::AlreadyOpen`]
    Reject,
}

/// Behavior knobs for [`TelemetryLogger`]
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub reopen_policy: ReopenPolicy,
    /// Only fixes from this provider are logged
    pub expected_provider: String,
    /// Write version and column comments at the top of each file
    pub write_header: bool,
    pub retention: RetentionPolicy,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            reopen_policy: ReopenPolicy::default(),
            expected_provider: GPS_PROVIDER.to_string(),
            write_header: true,
            retention: RetentionPolicy::default(),
        }
    }
}

impl From<&Config> for LoggerOptions {
    fn from(config: &Config) -> Self {
        Self {
            reopen_policy: config.reopen_policy,
            expected_provider: config.expected_provider.clone(),
            write_header: config.write_header,
            retention: RetentionPolicy {
                max_files: config.max_files_stored,
                min_usable_bytes: config.minimum_usable_file_size_bytes,
                evict_by_count: config.evict_by_count,
            },
        }
    }
}

/// Outcome of [`TelemetryLogger::start`], one result per channel
#[derive(Debug)]
pub struct StartReport {
    pub positioning: Result<PathBuf, LoggerError>,
    pub motion: Result<PathBuf, LoggerError>,
}

impl StartReport {
    /// Whether both channels opened
    pub fn all_opened(&self) -> bool {
        self.positioning.is_ok() && self.motion.is_ok()
    }

    /// Paths of the files that were opened
    pub fn opened(&self) -> Vec<&Path> {
        [&self.positioning, &self.motion]
            .into_iter()
            .filter_map(|r| r.as_ref().ok().map(PathBuf::as_path))
            .collect()
    }
}

/// Snapshot of one channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStatus {
    /// File being written, if the channel is open
    pub path: Option<PathBuf>,
    /// Records appended since the file was opened
    pub records_written: u64,
}

impl ChannelStatus {
    pub fn is_open(&self) -> bool {
        self.path.is_some()
    }
}

/// Snapshot of both channels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub positioning: ChannelStatus,
    pub motion: ChannelStatus,
}

impl SessionStatus {
    /// Whether either channel is open
    pub fn is_logging(&self) -> bool {
        self.positioning.is_open() || self.motion.is_open()
    }
}

/// Concurrent logger writing positioning and motion records to two files
pub struct TelemetryLogger {
    factory: FileFactory,
    positioning: Channel,
    motion: Channel,
    control: Mutex<()>,
    sink: Arc<dyn StatusSink>,
    options: LoggerOptions,
}

impl TelemetryLogger {
    pub fn new(factory: FileFactory, sink: Arc<dyn StatusSink>, options: LoggerOptions) -> Self {
        Self {
            factory,
            positioning: Channel::new(ChannelKind::Positioning),
            motion: Channel::new(ChannelKind::Motion),
            control: Mutex::new(()),
            sink,
            options,
        }
    }

    /// Directory the log files are written to
    pub fn base_dir(&self) -> &Path {
        self.factory.base_dir()
    }

    pub fn options(&self) -> &LoggerOptions {
        &self.options
    }

    /// Open a new file on each channel
    ///
    /// Channels succeed or fail independently; a failure on one does not
    /// prevent the other from opening.
    pub fn start(&self) -> StartReport {
        let _control = self.control_lock();
        StartReport {
            positioning: self.open_channel(&self.positioning),
            motion: self.open_channel(&self.motion),
        }
    }

    /// Flush and close every open channel
    ///
    /// Channels are closed in order and the first failure is returned without
    /// closing the rest. The failed channel is still released, so calling
    /// `stop` again finishes the job. Closed channels are skipped.
    pub fn stop(&self) -> Result<(), LoggerError> {
        let _control = self.control_lock();
        for kind in ChannelKind::ALL {
            self.close_channel(self.channel(kind))?;
        }
        Ok(())
    }

    /// Log a positioning fix
    ///
    /// Fixes from other providers, and any fix while the channel is closed,
    /// are dropped without error.
    pub fn on_location(&self, fix: &PositionFix) -> Result<(), LoggerError> {
        if fix.provider != self.options.expected_provider {
            return Ok(());
        }
        self.append(&self.positioning, || format::format_position(fix).map(Some))
    }

    /// Log a motion-sensor sample
    ///
    /// Samples from sensor types this logger does not record are ignored.
    pub fn on_sensor(&self, sample: &MotionSample) -> Result<(), LoggerError> {
        self.append(&self.motion, || format::format_motion(sample))
    }

    /// Push buffered records of both channels to disk
    pub fn flush(&self) -> Result<(), LoggerError> {
        for kind in ChannelKind::ALL {
            let result = self.channel(kind).lock().flush();
            if let Err(source) = result {
                return Err(self.reported(LoggerError::WriteFailed {
                    channel: kind,
                    source,
                }));
            }
        }
        Ok(())
    }

    /// Paths of the files currently open
    pub fn retained_paths(&self) -> Vec<PathBuf> {
        ChannelKind::ALL
            .into_iter()
            .filter_map(|kind| self.channel(kind).lock().path().map(Path::to_path_buf))
            .collect()
    }

    /// Run the retention sweeper over the base directory
    ///
    /// Open files are protected. No session can start or stop while the
    /// sweep runs.
    pub fn sweep(&self) -> Result<SweepReport> {
        let _control = self.control_lock();
        let retained = self.retained_paths();
        let report = retention::sweep(self.factory.base_dir(), &retained, &self.options.retention)?;
        if report.total() > 0 {
            tracing::info!(
                undersized = report.undersized,
                evicted = report.evicted,
                "Removed stale log files"
            );
        }
        Ok(report)
    }

    /// Snapshot of both channels, each taken under its own lock
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            positioning: self.channel_status(ChannelKind::Positioning),
            motion: self.channel_status(ChannelKind::Motion),
        }
    }

    fn channel(&self, kind: ChannelKind) -> &Channel {
        match kind {
            ChannelKind::Positioning => &self.positioning,
            ChannelKind::Motion => &self.motion,
        }
    }

    fn channel_status(&self, kind: ChannelKind) -> ChannelStatus {
        let state = self.channel(kind).lock();
        ChannelStatus {
            path: state.path().map(Path::to_path_buf),
            records_written: state.records_written(),
        }
    }

    /// Open a channel's next file, notifying the sink once its lock is released
    fn open_channel(&self, channel: &Channel) -> Result<PathBuf, LoggerError> {
        let kind = channel.kind();
        let mut problems = Vec::new();
        let result = {
            let mut state = channel.lock();
            self.open_locked(kind, &mut state, &mut problems)
        };

        for problem in &problems {
            self.report(problem, Severity::Error);
        }
        match &result {
            Ok(path) => {
                tracing::info!(channel = %kind, path = %path.display(), "Opened log file");
                self.sink
                    .notify(&format!("{} File opened: {}", kind, path.display()), Severity::Info);
            }
            Err(err @ LoggerError::AlreadyOpen { .. }) => self.report(err, Severity::Warning),
            Err(err) => self.report(err, Severity::Error),
        }
        result
    }

    /// Replace the channel's writer with a new file
    ///
    /// Failures that do not stop the file from opening go to `problems`.
    fn open_locked(
        &self,
        kind: ChannelKind,
        state: &mut ChannelState,
        problems: &mut Vec<LoggerError>,
    ) -> Result<PathBuf, LoggerError> {
        if state.is_open() {
            match self.options.reopen_policy {
                ReopenPolicy::Reject => {
                    let path = state.path().map(Path::to_path_buf).unwrap_or_default();
                    return Err(LoggerError::AlreadyOpen { channel: kind, path });
                }
                ReopenPolicy::Rotate => {
                    // The old handle is released even if its flush fails
                    if let Err(source) = state.close() {
                        problems.push(LoggerError::CloseFailed { channel: kind, source });
                    }
                }
            }
        }

        let open = self.factory.create_file(kind.name_prefix())?;
        let path = open.file.path.clone();
        state.install(open);

        if self.options.write_header {
            for line in format::header_lines(kind) {
                if let Err(source) = state.write_comment(&line) {
                    problems.push(LoggerError::WriteFailed { channel: kind, source });
                    break;
                }
            }
        }
        Ok(path)
    }

    fn close_channel(&self, channel: &Channel) -> Result<(), LoggerError> {
        let kind = channel.kind();
        let result = channel.lock().close();
        match result {
            Ok(Some(path)) => {
                tracing::info!(channel = %kind, path = %path.display(), "Closed log file");
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(source) => Err(self.reported(LoggerError::CloseFailed { channel: kind, source })),
        }
    }

    /// Render and write one record under the channel lock
    ///
    /// Errors are reported after the lock is released.
    fn append<F>(&self, channel: &Channel, render: F) -> Result<(), LoggerError>
    where
        F: FnOnce() -> Result<Option<String>, LoggerError>,
    {
        let result = {
            let mut state = channel.lock();
            if !state.is_open() {
                return Ok(());
            }
            match render() {
                Ok(Some(line)) => state
                    .write_record(&line)
                    .map(|_| ())
                    .map_err(|source| LoggerError::WriteFailed {
                        channel: channel.kind(),
                        source,
                    }),
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            }
        };
        result.map_err(|e| self.reported(e))
    }

    /// Send an error to the status sink and hand it back
    fn reported(&self, err: LoggerError) -> LoggerError {
        self.report(&err, Severity::Error);
        err
    }

    fn report(&self, err: &LoggerError, severity: Severity) {
        match severity {
            Severity::Error => tracing::error!(error = %err, "Telemetry logger error"),
            _ => tracing::warn!(error = %err, "Telemetry logger warning"),
        }
        self.sink.notify(&err.user_message(), severity);
    }

    fn control_lock(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusBuffer;
    use crate::storage::StorageState;
    use super::factory::tests::FakeStorage;
    use std::sync::{mpsc, OnceLock, Weak};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        storage: Arc<FakeStorage>,
        status: Arc<StatusBuffer>,
        logger: Arc<TelemetryLogger>,
    }

    fn fixture(options: LoggerOptions) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(FakeStorage::new(temp_dir.path(), StorageState::Writable));
        let status = Arc::new(StatusBuffer::new(100, 100));
        let logger = Arc::new(TelemetryLogger::new(
            FileFactory::new(storage.clone()),
            status.clone(),
            options,
        ));
        Fixture {
            _temp_dir: temp_dir,
            storage,
            status,
            logger,
        }
    }

    fn no_header() -> LoggerOptions {
        LoggerOptions {
            write_header: false,
            ..LoggerOptions::default()
        }
    }

    fn record_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_start_then_stop_leaves_two_empty_files() {
        let f = fixture(no_header());

        let report = f.logger.start();
        assert!(report.all_opened());
        let gps = report.positioning.unwrap();
        let imu = report.motion.unwrap();
        assert!(gps.file_name().unwrap().to_string_lossy().starts_with("pseudoranges_gps_log_"));
        assert!(imu.file_name().unwrap().to_string_lossy().starts_with("pseudoranges_imu_log_"));

        f.logger.stop().unwrap();

        assert_eq!(std::fs::metadata(&gps).unwrap().len(), 0);
        assert_eq!(std::fs::metadata(&imu).unwrap().len(), 0);
        assert!(!f.logger.status().is_logging());
        assert!(f.logger.retained_paths().is_empty());
    }

    #[test]
    fn test_header_is_comment_only() {
        let f = fixture(LoggerOptions::default());
        let report = f.logger.start();
        f.logger.stop().unwrap();

        let gps = report.positioning.unwrap();
        let content = std::fs::read_to_string(&gps).unwrap();
        assert!(content.starts_with("# Version: "));
        assert!(record_lines(&gps).is_empty());
    }

    #[test]
    fn test_append_while_closed_is_noop() {
        let f = fixture(no_header());

        f.logger
            .on_location(&PositionFix::gps(1, 1.0, 2.0, 3.0, 4.0))
            .unwrap();
        f.logger
            .on_sensor(&MotionSample::new(SensorType::Accelerometer, vec![1.0, 2.0, 3.0], 5))
            .unwrap();

        assert!(f.status.is_empty());
        assert!(!f.logger.base_dir().exists());
    }

    #[test]
    fn test_records_written_to_their_channels() {
        let f = fixture(no_header());
        let report = f.logger.start();

        f.logger
            .on_location(&PositionFix::gps(1000, 37.5, -122.25, 10.0, 5.0))
            .unwrap();
        f.logger
            .on_sensor(&MotionSample::new(SensorType::Gyroscope, vec![0.1, 0.2, 0.3], 77))
            .unwrap();
        assert_eq!(f.logger.status().positioning.records_written, 1);
        f.logger.stop().unwrap();

        assert_eq!(
            record_lines(report.positioning.as_ref().unwrap()),
            vec!["1000,37.500000,-122.250000,10.000000,5.000000"]
        );
        assert_eq!(
            record_lines(report.motion.as_ref().unwrap()),
            vec!["Gyro,77,0.100000,0.200000,0.300000"]
        );
    }

    #[test]
    fn test_other_provider_and_unknown_sensor_are_dropped() {
        let f = fixture(no_header());
        let report = f.logger.start();

        let mut network_fix = PositionFix::gps(1, 1.0, 1.0, 1.0, 1.0);
        network_fix.provider = "network".to_string();
        f.logger.on_location(&network_fix).unwrap();
        f.logger
            .on_sensor(&MotionSample::new(SensorType::Other(2), vec![1.0, 2.0, 3.0], 1))
            .unwrap();
        f.logger.stop().unwrap();

        assert!(record_lines(report.positioning.as_ref().unwrap()).is_empty());
        assert!(record_lines(report.motion.as_ref().unwrap()).is_empty());
    }

    #[test]
    fn test_concurrent_appends_produce_whole_lines() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let f = fixture(no_header());
        let report = f.logger.start();

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let logger = Arc::clone(&f.logger);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let millis = (t * PER_THREAD + i) as i64;
                        logger
                            .on_location(&PositionFix::gps(millis, 45.0, 7.0, 100.0, 2.5))
                            .unwrap();
                        logger
                            .on_sensor(&MotionSample::new(
                                SensorType::Accelerometer,
                                vec![0.0, 0.0, 9.81],
                                millis,
                            ))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        f.logger.stop().unwrap();

        let gps_lines = record_lines(report.positioning.as_ref().unwrap());
        assert_eq!(gps_lines.len(), THREADS * PER_THREAD);
        let mut times: Vec<i64> = gps_lines
            .iter()
            .map(|l| format::parse_position_line(l).unwrap().time_millis)
            .collect();
        times.sort_unstable();
        let expected: Vec<i64> = (0..(THREADS * PER_THREAD) as i64).collect();
        assert_eq!(times, expected);

        let imu_lines = record_lines(report.motion.as_ref().unwrap());
        assert_eq!(imu_lines.len(), THREADS * PER_THREAD);
        assert!(imu_lines
            .iter()
            .all(|l| l.starts_with("Accel,") && l.split(',').count() == 5));
    }

    #[test]
    fn test_stop_racing_appends_never_tears_lines() {
        let f = fixture(no_header());
        let report = f.logger.start();

        let writer = {
            let logger = Arc::clone(&f.logger);
            thread::spawn(move || {
                for i in 0..5_000 {
                    logger
                        .on_location(&PositionFix::gps(i, 1.0, 2.0, 3.0, 4.0))
                        .unwrap();
                }
            })
        };
        thread::sleep(Duration::from_millis(1));
        f.logger.stop().unwrap();
        writer.join().unwrap();

        for line in record_lines(report.positioning.as_ref().unwrap()) {
            assert!(format::parse_position_line(&line).is_some(), "torn line: {}", line);
        }
    }

    #[test]
    fn test_unavailable_storage_leaves_channels_closed() {
        let f = fixture(no_header());
        f.storage.set_state(StorageState::Unavailable);

        let report = f.logger.start();
        assert!(matches!(report.positioning, Err(LoggerError::StorageUnavailable)));
        assert!(matches!(report.motion, Err(LoggerError::StorageUnavailable)));
        assert!(report.opened().is_empty());
        assert_eq!(f.status.alert_count(), 2);
        assert!(!f.logger.status().is_logging());

        f.storage.set_state(StorageState::Writable);
        assert!(f.logger.start().all_opened());
        f.logger.stop().unwrap();
    }

    #[test]
    fn test_read_only_storage_is_reported() {
        let f = fixture(no_header());
        f.storage.set_state(StorageState::ReadOnly);

        let report = f.logger.start();
        assert!(matches!(report.positioning, Err(LoggerError::StorageReadOnly)));
        assert_eq!(
            f.status.pending_alerts()[0].message,
            "Cannot write to external storage."
        );
    }

    #[test]
    fn test_stop_is_idempotent() {
        let f = fixture(no_header());
        f.logger.stop().unwrap();
        f.logger.start();
        f.logger.stop().unwrap();
        f.logger.stop().unwrap();
        assert!(!f.logger.status().is_logging());
    }

    #[test]
    fn test_reject_policy_keeps_open_file() {
        let f = fixture(LoggerOptions {
            reopen_policy: ReopenPolicy::Reject,
            ..no_header()
        });
        let first = f.logger.start();
        let second = f.logger.start();

        match second.positioning {
            Err(LoggerError::AlreadyOpen { channel, path }) => {
                assert_eq!(channel, ChannelKind::Positioning);
                assert_eq!(&path, first.positioning.as_ref().unwrap());
            }
            other => panic!("expected AlreadyOpen, got {:?}", other),
        }
        assert_eq!(
            f.logger.status().positioning.path.as_ref(),
            first.positioning.as_ref().ok()
        );
    }

    #[test]
    fn test_rotate_policy_closes_previous_file() {
        let f = fixture(no_header());
        let first = f.logger.start();
        f.logger
            .on_location(&PositionFix::gps(1, 1.0, 2.0, 3.0, 4.0))
            .unwrap();

        // File names have one-second resolution
        thread::sleep(Duration::from_millis(1100));
        let second = f.logger.start();
        assert_ne!(
            first.positioning.as_ref().unwrap(),
            second.positioning.as_ref().unwrap()
        );
        assert_eq!(f.logger.status().positioning.records_written, 0);

        // The superseded file was flushed when it was closed
        assert_eq!(record_lines(first.positioning.as_ref().unwrap()).len(), 1);
        f.logger.stop().unwrap();
    }

    #[test]
    fn test_format_error_is_reported_and_channel_stays_open() {
        let f = fixture(no_header());
        let report = f.logger.start();

        let err = f
            .logger
            .on_location(&PositionFix::gps(1, f64::NAN, 2.0, 3.0, 4.0))
            .unwrap_err();
        assert!(matches!(err, LoggerError::FormatError { .. }));
        assert_eq!(f.status.alert_count(), 1);

        f.logger
            .on_location(&PositionFix::gps(2, 1.0, 2.0, 3.0, 4.0))
            .unwrap();
        f.logger.stop().unwrap();
        assert_eq!(record_lines(report.positioning.as_ref().unwrap()).len(), 1);
    }

    #[test]
    fn test_sweep_protects_open_files() {
        let f = fixture(no_header());
        std::fs::create_dir_all(f.logger.base_dir()).unwrap();
        let stale = f.logger.base_dir().join("pseudoranges_gps_log_2017_01_01_00_00_00.txt");
        std::fs::write(&stale, b"1,2,3,4,5\n").unwrap();

        let report = f.logger.start();
        let removed = f.logger.sweep().unwrap();

        assert_eq!(removed.total(), 1);
        assert!(!stale.exists());
        for path in report.opened() {
            assert!(path.exists());
        }
        f.logger.stop().unwrap();
    }

    #[test]
    fn test_flush_makes_records_visible() {
        let f = fixture(no_header());
        let report = f.logger.start();
        f.logger
            .on_location(&PositionFix::gps(9, 1.0, 2.0, 3.0, 4.0))
            .unwrap();
        f.logger.flush().unwrap();

        assert_eq!(record_lines(report.positioning.as_ref().unwrap()).len(), 1);
        f.logger.stop().unwrap();
    }

    /// Sink that reads the logger back from inside `notify`
    #[derive(Default)]
    struct ReadBackSink {
        logger: OnceLock<Weak<TelemetryLogger>>,
        seen: Mutex<Vec<(SessionStatus, usize)>>,
    }

    impl StatusSink for ReadBackSink {
        fn notify(&self, _message: &str, _severity: Severity) {
            if let Some(logger) = self.logger.get().and_then(Weak::upgrade) {
                let status = logger.status();
                let retained = logger.retained_paths().len();
                self.seen.lock().unwrap().push((status, retained));
            }
        }
    }

    #[test]
    fn test_sink_can_read_status_during_start() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(ReadBackSink::default());
        let logger = Arc::new(TelemetryLogger::new(
            FileFactory::new(Arc::new(FakeStorage::new(
                temp_dir.path(),
                StorageState::Writable,
            ))),
            sink.clone(),
            no_header(),
        ));
        sink.logger.set(Arc::downgrade(&logger)).unwrap();

        let (tx, rx) = mpsc::channel();
        let worker = {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                let report = logger.start();
                logger.stop().unwrap();
                tx.send(report.all_opened()).unwrap();
            })
        };
        let opened = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("start did not return");
        assert!(opened);
        worker.join().unwrap();

        // One "File opened" notification per channel, sent after each opened
        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0.positioning.is_open());
        assert!(!seen[0].0.motion.is_open());
        assert_eq!(seen[1].1, 2);
    }

    #[test]
    fn test_sink_can_read_status_on_rejected_start() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(ReadBackSink::default());
        let logger = Arc::new(TelemetryLogger::new(
            FileFactory::new(Arc::new(FakeStorage::new(
                temp_dir.path(),
                StorageState::Writable,
            ))),
            sink.clone(),
            LoggerOptions {
                reopen_policy: ReopenPolicy::Reject,
                ..no_header()
            },
        ));
        logger.start();
        sink.logger.set(Arc::downgrade(&logger)).unwrap();

        let (tx, rx) = mpsc::channel();
        let worker = {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                let report = logger.start();
                tx.send(report.opened().is_empty()).unwrap();
            })
        };
        assert!(rx.recv_timeout(Duration::from_secs(5)).expect("start did not return"));
        worker.join().unwrap();

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(status, retained)| status.is_logging() && *retained == 2));
        drop(seen);
        logger.stop().unwrap();
    }

    /// Swap a channel's file for a writer on a device that is always full
    #[cfg(target_os = "linux")]
    fn install_full_device(logger: &TelemetryLogger, kind: ChannelKind) {
        use chrono::Local;
        use std::fs::OpenOptions;
        use std::io::BufWriter;

        let full = OpenOptions::new().write(true).open("/dev/full").unwrap();
        let mut state = logger.channel(kind).lock();
        state.close().unwrap();
        state.install(OpenLogFile {
            file: LogFile {
                path: PathBuf::from("/dev/full"),
                name_prefix: kind.name_prefix().to_string(),
                created_at: Local::now(),
            },
            writer: BufWriter::new(full),
        });
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_is_reported_and_channel_stays_open() {
        let f = fixture(no_header());
        let report = f.logger.start();
        install_full_device(&f.logger, ChannelKind::Positioning);

        // Enough records to overflow the write buffer several times
        let failures: Vec<LoggerError> = (0..2_000)
            .filter_map(|i| {
                f.logger
                    .on_location(&PositionFix::gps(i, 1.0, 2.0, 3.0, 4.0))
                    .err()
            })
            .collect();

        assert!(!failures.is_empty());
        assert!(failures.iter().all(|e| matches!(
            e,
            LoggerError::WriteFailed {
                channel: ChannelKind::Positioning,
                ..
            }
        )));
        assert_eq!(
            f.logger.status().positioning.path,
            Some(PathBuf::from("/dev/full"))
        );
        assert!(f
            .status
            .pending_alerts()
            .iter()
            .all(|a| a.message.starts_with("Problem writing to GPS file.")));

        // The other channel is unaffected
        f.logger
            .on_sensor(&MotionSample::new(SensorType::Accelerometer, vec![0.0, 0.0, 9.81], 1))
            .unwrap();
        assert_eq!(f.logger.status().motion.records_written, 1);

        assert!(f.logger.stop().is_err());
        f.logger.stop().unwrap();
        assert_eq!(record_lines(report.motion.as_ref().unwrap()).len(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stop_returns_first_close_failure() {
        let f = fixture(no_header());
        let report = f.logger.start();
        install_full_device(&f.logger, ChannelKind::Positioning);
        f.logger
            .on_location(&PositionFix::gps(1, 1.0, 2.0, 3.0, 4.0))
            .unwrap();

        let err = f.logger.stop().unwrap_err();
        assert!(matches!(
            err,
            LoggerError::CloseFailed {
                channel: ChannelKind::Positioning,
                ..
            }
        ));
        let status = f.logger.status();
        assert!(!status.positioning.is_open());
        assert!(status.motion.is_open());
        assert_eq!(f.status.alert_count(), 1);

        f.logger.stop().unwrap();
        assert!(!f.logger.status().is_logging());
        assert!(report.motion.as_ref().unwrap().exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_rotate_after_close_failure_opens_new_file() {
        let f = fixture(no_header());
        f.logger.start();
        install_full_device(&f.logger, ChannelKind::Positioning);
        f.logger
            .on_location(&PositionFix::gps(1, 1.0, 2.0, 3.0, 4.0))
            .unwrap();

        let report = f.logger.start();
        let path = report.positioning.unwrap();
        assert!(path.starts_with(f.logger.base_dir()));
        assert_eq!(f.logger.status().positioning.path.as_ref(), Some(&path));

        let alerts = f.status.pending_alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.starts_with("Unable to close GPS file stream."));
        f.logger.stop().unwrap();
    }
}
