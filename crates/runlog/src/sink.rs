//! The outbound run-log seam.

use async_trait::async_trait;
use jobrelay_core::{JobInvocation, JobOutcome};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a single run-log delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum RunLogError {
    /// The run-log endpoint URL could not be built.
    #[error("Invalid run-log URL: {0}")]
    InvalidUrl(String),

    /// The request timeout would make every update fail.
    #[error("Run-log request timeout must be greater than zero")]
    ZeroTimeout,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The run-log API answered with a non-2xx status code.
    #[error("Run-log API returned HTTP {0}")]
    HttpStatus(u16),

    /// The sink refused the entry for a sink-specific reason.
    #[error("Run-log sink rejected the entry: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// RunLogEntry
// ---------------------------------------------------------------------------

/// One outcome keyed by the run it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLogEntry {
    pub job_id: String,
    pub schedule_id: String,
    pub run_id: String,
    pub outcome: JobOutcome,
}

impl RunLogEntry {
    pub fn new(invocation: &JobInvocation, outcome: JobOutcome) -> Self {
        Self {
            job_id: invocation.job_id().to_string(),
            schedule_id: invocation.schedule_id().to_string(),
            run_id: invocation.run_id().to_string(),
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// RunLogSink
// ---------------------------------------------------------------------------

/// External system of record for run outcomes.
///
/// Implementations are shared across all in-flight runs and must accept
/// concurrent, unordered calls. A call is one delivery attempt; sinks must
/// not retry internally.
#[async_trait]
pub trait RunLogSink: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Record `entry` in the run log.
    async fn update_run_log(&self, entry: &RunLogEntry) -> Result<(), RunLogError>;
}
