//! Asynchronous job-callback dispatcher.
//!
//! [`Dispatcher::accept`] validates an invocation, returns an
//! [`Acknowledgment`] straight away, and runs the caller-supplied
//! [`WorkUnit`] on a tracked background task once that acknowledgment is
//! dropped. When the work finishes (or fails) the outcome goes to the
//! [`RunReporter`](jobrelay_runlog::RunReporter) exactly once.

pub mod dispatcher;
pub mod work;

pub use dispatcher::{Acknowledgment, Dispatcher, DispatcherConfig, ExecutionError};
pub use work::{work_fn, FnWork, WorkUnit};
