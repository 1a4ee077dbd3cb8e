//! Log-only sink, used when no run-log API is configured.

use async_trait::async_trait;

use crate::sink::{RunLogEntry, RunLogError, RunLogSink};

/// Writes each entry to the tracing log and never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

#[async_trait]
impl RunLogSink for LoggingSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn update_run_log(&self, entry: &RunLogEntry) -> Result<(), RunLogError> {
        tracing::info!(
            job_id = %entry.job_id,
            schedule_id = %entry.schedule_id,
            run_id = %entry.run_id,
            success = entry.outcome.success,
            duration_ms = entry.outcome.duration_ms,
            message = %entry.outcome.message,
            "Run log entry (no run-log API configured)"
        );
        Ok(())
    }
}
