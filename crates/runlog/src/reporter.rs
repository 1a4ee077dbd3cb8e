//! Delivers a run's outcome to the run-log sink, once.

use std::sync::Arc;

use jobrelay_core::{JobInvocation, JobOutcome};

use crate::delivery::http::{HttpRunLogSink, RunLogConfig};
use crate::delivery::log::LoggingSink;
use crate::sink::{RunLogEntry, RunLogError, RunLogSink};

/// A run-log update that did not go through.
///
/// The run is lost from the reporting perspective; nothing is retried.
#[derive(Debug, thiserror::Error)]
#[error("Run log update failed for job {job_id}, run {run_id}: {source}")]
pub struct ReportError {
    pub job_id: String,
    pub run_id: String,
    #[source]
    pub source: RunLogError,
}

/// Reports terminal outcomes to a shared [`RunLogSink`].
///
/// Cheap to clone; all clones share the same sink.
#[derive(Clone)]
pub struct RunReporter {
    sink: Arc<dyn RunLogSink>,
}

impl RunReporter {
    pub fn new(sink: Arc<dyn RunLogSink>) -> Self {
        Self { sink }
    }

    /// Build a reporter for the HTTP run-log API, or a log-only reporter when
    /// `config` is `None`.
    pub fn from_config(config: Option<RunLogConfig>) -> Result<Self, RunLogError> {
        let sink: Arc<dyn RunLogSink> = match config {
            Some(config) => Arc::new(HttpRunLogSink::new(config)?),
            None => Arc::new(LoggingSink),
        };
        Ok(Self::new(sink))
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Deliver `outcome` for `invocation`, making a single attempt.
    ///
    /// Failures are logged here and returned; callers only need to decide
    /// whether to look at them.
    pub async fn report(
        &self,
        invocation: &JobInvocation,
        outcome: JobOutcome,
    ) -> Result<(), ReportError> {
        let entry = RunLogEntry::new(invocation, outcome);

        match self.sink.update_run_log(&entry).await {
            Ok(()) => {
                tracing::info!(
                    job_id = %entry.job_id,
                    schedule_id = %entry.schedule_id,
                    run_id = %entry.run_id,
                    success = entry.outcome.success,
                    sink = self.sink.name(),
                    "Run log updated"
                );
                Ok(())
            }
            Err(source) => {
                tracing::error!(
                    job_id = %entry.job_id,
                    schedule_id = %entry.schedule_id,
                    run_id = %entry.run_id,
                    sink = self.sink.name(),
                    error = %source,
                    "Failed to update run log"
                );
                Err(ReportError {
                    job_id: entry.job_id,
                    run_id: entry.run_id,
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for RunReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunReporter")
            .field("sink", &self.sink.name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use jobrelay_core::InvocationCandidate;

    use super::*;

    /// Records every entry; fails when `fail` is set.
    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<RunLogEntry>>,
        fail: bool,
    }

    #[async_trait]
    impl RunLogSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn update_run_log(&self, entry: &RunLogEntry) -> Result<(), RunLogError> {
            self.entries.lock().unwrap().push(entry.clone());
            if self.fail {
                return Err(RunLogError::Rejected("sink offline".into()));
            }
            Ok(())
        }
    }

    fn invocation() -> JobInvocation {
        InvocationCandidate::new()
            .with_job_id("42")
            .with_schedule_id("S1")
            .with_run_id("R1")
            .validate()
            .unwrap()
    }

    #[tokio::test]
    async fn report_tags_outcome_with_run_identifiers() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = RunReporter::new(sink.clone());
        let outcome = JobOutcome::failed(Duration::from_millis(5), "boom");

        reporter.report(&invocation(), outcome.clone()).await.unwrap();

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].job_id, "42");
        assert_eq!(entries[0].schedule_id, "S1");
        assert_eq!(entries[0].run_id, "R1");
        assert_eq!(entries[0].outcome, outcome);
    }

    #[tokio::test]
    async fn failed_delivery_is_surfaced_without_retry() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let reporter = RunReporter::new(sink.clone());

        let result = reporter
            .report(&invocation(), JobOutcome::failed(Duration::ZERO, "x"))
            .await;

        assert_matches!(result, Err(ReportError { ref run_id, .. }) if run_id == "R1");
        assert_eq!(sink.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn report_error_display_includes_source() {
        let err = ReportError {
            job_id: "42".into(),
            run_id: "R1".into(),
            source: RunLogError::HttpStatus(503),
        };
        assert_eq!(
            err.to_string(),
            "Run log update failed for job 42, run R1: Run-log API returned HTTP 503"
        );
    }

    #[test]
    fn from_config_without_url_logs_only() {
        let reporter = RunReporter::from_config(None).unwrap();
        assert_eq!(reporter.sink_name(), "log");
    }

    #[test]
    fn from_config_with_url_uses_http() {
        let reporter =
            RunReporter::from_config(Some(RunLogConfig::new("https://scheduler.local"))).unwrap();
        assert_eq!(reporter.sink_name(), "http");
    }
}
