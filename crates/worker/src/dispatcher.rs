//! Accept-then-execute dispatcher.
//!
//! The request path only validates and acknowledges. Execution and reporting
//! run on a [`TaskTracker`] so the server can wait for in-flight runs during
//! shutdown. A spawned run stays parked until its [`Acknowledgment`] is
//! dropped, so no outcome can exist before the receipt has been handed out.
//!
//! Every run has its own error boundary: a failing, panicking or timed-out
//! work unit becomes a `success = false` outcome and is still reported.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use jobrelay_core::{CoreError, InvocationCandidate, JobInvocation, JobOutcome, RunState};
use jobrelay_runlog::RunReporter;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

use crate::work::WorkUnit;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Execution policy applied to every run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatcherConfig {
    /// Upper bound on a single work-unit execution. `None` lets work run as
    /// long as it needs.
    pub timeout: Option<Duration>,
}

impl DispatcherConfig {
    /// Load the execution policy from the environment.
    ///
    /// | Env Var            | Default            |
    /// |--------------------|--------------------|
    /// | `JOB_TIMEOUT_SECS` | unset (no timeout) |
    ///
    /// # Panics
    ///
    /// Panics if `JOB_TIMEOUT_SECS` is set to anything but a positive
    /// integer.
    pub fn from_env() -> Self {
        let timeout = std::env::var("JOB_TIMEOUT_SECS")
            .ok()
            .map(|raw| parse_timeout_secs("JOB_TIMEOUT_SECS", &raw));
        Self { timeout }
    }
}

/// Parse a strictly positive number of seconds from an env var value.
fn parse_timeout_secs(var: &str, raw: &str) -> Duration {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => panic!("{var} must be a positive integer, got {raw:?}"),
    }
}

// ---------------------------------------------------------------------------
// Acknowledgment
// ---------------------------------------------------------------------------

/// Receipt for an accepted invocation. Says nothing about the outcome.
///
/// The run behind it starts only once the acknowledgment is dropped. Build
/// the response from it first, then let it go; holding it forever holds the
/// run (and [`Dispatcher::shutdown`]) forever.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgment {
    pub job_id: String,
    pub schedule_id: String,
    pub run_id: String,
    #[serde(skip)]
    _release: oneshot::Sender<()>,
}

impl Acknowledgment {
    /// Receipt for `invocation` plus the signal its run waits on.
    fn pending(invocation: &JobInvocation) -> (Self, oneshot::Receiver<()>) {
        let (release, released) = oneshot::channel();
        let ack = Self {
            job_id: invocation.job_id().to_string(),
            schedule_id: invocation.schedule_id().to_string(),
            run_id: invocation.run_id().to_string(),
            _release: release,
        };
        (ack, released)
    }
}

// ---------------------------------------------------------------------------
// ExecutionError
// ---------------------------------------------------------------------------

/// Why a work-unit execution did not produce a result.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The work unit returned an error.
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The work unit panicked.
    #[error("work unit panicked: {0}")]
    Panicked(String),

    /// The configured timeout elapsed first.
    #[error("work unit timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Decouples "accept and acknowledge" from "execute and report".
///
/// Cheap to clone; clones share the work unit, the reporter and the task
/// tracker.
#[derive(Clone)]
pub struct Dispatcher {
    work: Arc<dyn WorkUnit>,
    reporter: RunReporter,
    config: DispatcherConfig,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(work: Arc<dyn WorkUnit>, reporter: RunReporter, config: DispatcherConfig) -> Self {
        Self {
            work,
            reporter,
            config,
            tracker: TaskTracker::new(),
        }
    }

    /// Number of runs that have been accepted but not yet reported.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Validate `candidate`, queue its run in the background and acknowledge.
    ///
    /// The run is parked until the returned [`Acknowledgment`] is dropped.
    /// Returns [`CoreError::MissingAttributes`] when job, schedule or run id
    /// is absent; nothing is executed or reported in that case. Must be
    /// called from within a Tokio runtime.
    pub fn accept(&self, candidate: InvocationCandidate) -> Result<Acknowledgment, CoreError> {
        let state = RunState::Received;
        tracing::debug!(state = %state, "Job invocation received");

        let invocation = match candidate.validate() {
            Ok(invocation) => invocation,
            Err(err) => {
                let state = advance(state, RunState::Rejected);
                tracing::warn!(state = %state, error = %err, "Job invocation rejected");
                return Err(err);
            }
        };

        let state = advance(state, RunState::Validated);
        tracing::debug!(
            job_id = invocation.job_id(),
            schedule_id = invocation.schedule_id(),
            run_id = invocation.run_id(),
            scheduler_host = invocation.scheduler_host(),
            state = %state,
            "Job invocation validated",
        );

        let (ack, released) = Acknowledgment::pending(&invocation);
        let this = self.clone();
        self.tracker.spawn(async move { this.run(invocation, released).await });

        let state = advance(state, RunState::Acknowledged);
        tracing::info!(
            job_id = %ack.job_id,
            schedule_id = %ack.schedule_id,
            run_id = %ack.run_id,
            state = %state,
            "Job accepted for processing",
        );
        Ok(ack)
    }

    /// Run the work unit for `invocation` and turn whatever happens into a
    /// [`JobOutcome`]. Never fails.
    pub async fn execute(&self, invocation: &JobInvocation) -> JobOutcome {
        let started = Instant::now();
        match self.run_work(invocation.payload().clone()).await {
            Ok(result) => JobOutcome::completed(started.elapsed(), &result),
            Err(err) => JobOutcome::failed(started.elapsed(), err),
        }
    }

    /// Run the work unit on `payload` inside the error boundary and return
    /// its raw result. Used directly by synchronous callers.
    pub async fn run_work(&self, payload: Value) -> Result<Value, ExecutionError> {
        let guarded = AssertUnwindSafe(self.work.execute(payload)).catch_unwind();

        let caught = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .map_err(|_| ExecutionError::TimedOut(limit))?,
            None => guarded.await,
        };

        match caught {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(ExecutionError::Failed(err)),
            Err(panic) => Err(ExecutionError::Panicked(panic_payload_to_string(&panic))),
        }
    }

    /// Stop tracking new runs and wait up to `grace` for in-flight ones.
    ///
    /// Returns `true` when every run finished (and reported) in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        tracing::info!(in_flight = self.tracker.len(), "Waiting for in-flight job runs");

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!("All job runs finished");
                true
            }
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracker.len(),
                    grace_secs = grace.as_secs(),
                    "Job runs still in flight at shutdown",
                );
                false
            }
        }
    }

    /// Background half of [`accept`](Self::accept): wait for the
    /// acknowledgment to be released, execute, then report once.
    async fn run(self, invocation: JobInvocation, released: oneshot::Receiver<()>) {
        // Fires with `Err` when the acknowledgment is dropped.
        let _ = released.await;

        let state = advance(RunState::Acknowledged, RunState::Executing);
        tracing::info!(
            job_id = invocation.job_id(),
            run_id = invocation.run_id(),
            state = %state,
            "Starting job execution",
        );

        let outcome = self.execute(&invocation).await;

        let state = if outcome.success {
            let state = advance(state, RunState::Completed);
            tracing::info!(
                job_id = invocation.job_id(),
                run_id = invocation.run_id(),
                duration_ms = outcome.duration_ms,
                state = %state,
                "Job completed successfully",
            );
            state
        } else {
            let state = advance(state, RunState::Failed);
            tracing::warn!(
                job_id = invocation.job_id(),
                run_id = invocation.run_id(),
                duration_ms = outcome.duration_ms,
                message = %outcome.message,
                state = %state,
                "Job failed",
            );
            state
        };

        // Delivery failures are already logged by the reporter.
        if self.reporter.report(&invocation, outcome).await.is_ok() {
            tracing::debug!(
                job_id = invocation.job_id(),
                run_id = invocation.run_id(),
                state = %advance(state, RunState::Reported),
                "Job run reported",
            );
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("reporter", &self.reporter)
            .field("config", &self.config)
            .field("in_flight", &self.tracker.len())
            .finish()
    }
}

/// Step the run lifecycle, checking the transition table in debug builds.
fn advance(from: RunState, to: RunState) -> RunState {
    debug_assert!(from.can_transition(to), "invalid run transition {from} -> {to}");
    to
}

fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
