//! Core domain types for the job relay.
//!
//! This crate has zero internal deps so the dispatcher, the run reporter and
//! the HTTP layer can all share one definition of an invocation and its
//! outcome.

pub mod error;
pub mod invocation;
pub mod outcome;
pub mod run_state;

pub use error::CoreError;
pub use invocation::{InvocationCandidate, JobInvocation, RequiredAttribute};
pub use outcome::JobOutcome;
pub use run_state::RunState;
