//! Job invocation descriptors.
//!
//! A scheduler delivers the identifying attributes of a run as request
//! headers and an arbitrary JSON payload as the body. The raw data lands in an
//! [`InvocationCandidate`]; the only way to obtain a [`JobInvocation`] is
//! [`InvocationCandidate::validate`], so every `JobInvocation` in circulation
//! carries non-empty job, schedule and run identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Wire names
// ---------------------------------------------------------------------------

/// Header carrying the job definition id.
pub const JOB_ID_HEADER: &str = "x-sap-job-id";

/// Header carrying the id of the schedule that fired.
pub const SCHEDULE_ID_HEADER: &str = "x-sap-job-schedule-id";

/// Header carrying the id of this execution attempt.
pub const RUN_ID_HEADER: &str = "x-sap-job-run-id";

/// Header carrying the originating scheduler host.
pub const SCHEDULER_HOST_HEADER: &str = "x-sap-scheduler-host";

// ---------------------------------------------------------------------------
// RequiredAttribute
// ---------------------------------------------------------------------------

/// An identifying attribute that must be present before dispatch proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequiredAttribute {
    JobId,
    ScheduleId,
    RunId,
}

impl RequiredAttribute {
    /// All required attributes, in the order they are checked.
    pub const ALL: [RequiredAttribute; 3] = [Self::JobId, Self::ScheduleId, Self::RunId];

    /// camelCase field name used in JSON bodies (e.g. `"runId"`).
    pub fn field_name(self) -> &'static str {
        match self {
            Self::JobId => "jobId",
            Self::ScheduleId => "scheduleId",
            Self::RunId => "runId",
        }
    }

    /// Request header that carries this attribute.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::JobId => JOB_ID_HEADER,
            Self::ScheduleId => SCHEDULE_ID_HEADER,
            Self::RunId => RUN_ID_HEADER,
        }
    }

    pub(crate) fn join(attrs: &[RequiredAttribute]) -> String {
        attrs
            .iter()
            .map(|a| a.field_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// InvocationCandidate
// ---------------------------------------------------------------------------

/// Raw, unvalidated invocation data as received from the trigger source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationCandidate {
    pub job_id: Option<String>,
    pub schedule_id: Option<String>,
    pub run_id: Option<String>,
    pub scheduler_host: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl InvocationCandidate {
    /// Create an empty candidate (every identifier missing, `null` payload).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_schedule_id(mut self, schedule_id: impl Into<String>) -> Self {
        self.schedule_id = Some(schedule_id.into());
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_scheduler_host(mut self, host: impl Into<String>) -> Self {
        self.scheduler_host = Some(host.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Check that job, schedule and run ids are present and non-blank.
    ///
    /// Identifiers are trimmed. On failure the error lists every missing
    /// attribute, not just the first one.
    pub fn validate(self) -> Result<JobInvocation, CoreError> {
        let job_id = non_blank(self.job_id);
        let schedule_id = non_blank(self.schedule_id);
        let run_id = non_blank(self.run_id);

        match (job_id, schedule_id, run_id) {
            (Some(job_id), Some(schedule_id), Some(run_id)) => Ok(JobInvocation {
                job_id,
                schedule_id,
                run_id,
                scheduler_host: non_blank(self.scheduler_host),
                payload: self.payload,
            }),
            (job_id, schedule_id, run_id) => {
                let missing = [
                    (RequiredAttribute::JobId, job_id.is_none()),
                    (RequiredAttribute::ScheduleId, schedule_id.is_none()),
                    (RequiredAttribute::RunId, run_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(attr, absent)| absent.then_some(attr))
                .collect();
                Err(CoreError::MissingAttributes(missing))
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// JobInvocation
// ---------------------------------------------------------------------------

/// A structurally valid trigger event for one job run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInvocation {
    job_id: String,
    schedule_id: String,
    run_id: String,
    scheduler_host: Option<String>,
    payload: Value,
}

impl JobInvocation {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn schedule_id(&self) -> &str {
        &self.schedule_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn scheduler_host(&self) -> Option<&str> {
        self.scheduler_host.as_deref()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
