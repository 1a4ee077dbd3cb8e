//! Run-log delivery over the scheduler's REST API.
//!
//! [`HttpRunLogSink`] sends one `PUT` per entry to
//! `{base_url}/scheduler/jobs/{jobId}/schedules/{scheduleId}/runs/{runId}`
//! with a `{ "success", "message" }` JSON body. There is no retry: a failed
//! attempt is returned to the caller as-is.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use crate::sink::{RunLogEntry, RunLogError, RunLogSink};

/// Default per-request timeout for a run-log update.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// RunLogConfig
// ---------------------------------------------------------------------------

/// Connection settings for the scheduler's run-log API.
#[derive(Debug, Clone)]
pub struct RunLogConfig {
    /// Scheduler service base URL, e.g. `https://jobscheduler.example.com`.
    pub base_url: String,
    /// Optional bearer token sent with every update.
    pub token: Option<String>,
    /// Timeout for a single update request.
    pub request_timeout: Duration,
}

impl RunLogConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `RUN_LOG_URL` is not set, signalling that outcomes
    /// should only be written to the log.
    ///
    /// | Variable               | Required | Default |
    /// |------------------------|----------|---------|
    /// | `RUN_LOG_URL`          | yes      | --      |
    /// | `RUN_LOG_TOKEN`        | no       | --      |
    /// | `RUN_LOG_TIMEOUT_SECS` | no       | `10`    |
    ///
    /// # Panics
    ///
    /// Panics if `RUN_LOG_TIMEOUT_SECS` is set to anything but a positive
    /// integer.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("RUN_LOG_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())?;
        let request_timeout = match std::env::var("RUN_LOG_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout_secs(&raw),
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        Some(Self {
            base_url,
            token: std::env::var("RUN_LOG_TOKEN").ok().filter(|t| !t.is_empty()),
            request_timeout,
        })
    }
}

fn parse_timeout_secs(raw: &str) -> Duration {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => panic!("RUN_LOG_TIMEOUT_SECS must be a positive integer, got {raw:?}"),
    }
}

// ---------------------------------------------------------------------------
// HttpRunLogSink
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunLogUpdate<'a> {
    success: bool,
    message: &'a str,
}

/// Delivers run outcomes to the scheduler's run-log REST endpoint.
pub struct HttpRunLogSink {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRunLogSink {
    /// Build a sink with a pre-configured HTTP client.
    ///
    /// Fails on a base URL that cannot take path segments or a zero request
    /// timeout.
    pub fn new(config: RunLogConfig) -> Result<Self, RunLogError> {
        if config.request_timeout.is_zero() {
            return Err(RunLogError::ZeroTimeout);
        }
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RunLogError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(RunLogError::InvalidUrl(config.base_url));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token,
        })
    }

    /// Endpoint for one run. Identifiers are percent-encoded as path segments.
    pub fn run_url(&self, entry: &RunLogEntry) -> Result<Url, RunLogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RunLogError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "scheduler",
                "jobs",
                entry.job_id.as_str(),
                "schedules",
                entry.schedule_id.as_str(),
                "runs",
                entry.run_id.as_str(),
            ]);
        Ok(url)
    }
}

impl std::fmt::Debug for HttpRunLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRunLogSink")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl RunLogSink for HttpRunLogSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn update_run_log(&self, entry: &RunLogEntry) -> Result<(), RunLogError> {
        let url = self.run_url(entry)?;
        let body = RunLogUpdate {
            success: entry.outcome.success,
            message: &entry.outcome.message,
        };

        let mut request = self.client.put(url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RunLogError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
