//! Run-log reporting.
//!
//! This crate delivers the terminal [`JobOutcome`](jobrelay_core::JobOutcome)
//! of a job run to the scheduler's run-log API:
//!
//! - [`RunReporter`] - makes exactly one delivery attempt per call and logs
//!   failures instead of retrying.
//! - [`RunLogSink`] - the outbound seam; any system of record can implement it.
//! - [`delivery`] - concrete sinks (HTTP run-log API, log-only).

pub mod delivery;
pub mod reporter;
pub mod sink;

pub use delivery::http::{HttpRunLogSink, RunLogConfig};
pub use delivery::log::LoggingSink;
pub use reporter::{ReportError, RunReporter};
pub use sink::{RunLogEntry, RunLogError, RunLogSink};
