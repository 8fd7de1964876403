//! Status reporting for the telemetry logger
//!
//! The logger never talks to a presentation layer directly. It reports session
//! events and failures through a [`StatusSink`], fire-and-forget.

mod buffer;
mod sink;

pub use buffer::{StatusBuffer, StatusEntry};
pub use sink::{Severity, StatusSink, TracingSink};
