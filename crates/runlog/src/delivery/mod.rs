//! Concrete run-log sinks.

pub mod http;
pub mod log;
