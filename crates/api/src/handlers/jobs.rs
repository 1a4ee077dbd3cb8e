//! Handlers for scheduler-triggered job endpoints.
//!
//! Both endpoints sit behind the [`JobCaller`] gate. The asynchronous
//! endpoint answers `202 Accepted` and reports the real outcome later through
//! the run-log API; the synchronous endpoint runs the work inline and answers
//! `200` or `500`, so the scheduler can tell the two apart.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use jobrelay_core::invocation::{
    JOB_ID_HEADER, RUN_ID_HEADER, SCHEDULER_HOST_HEADER, SCHEDULE_ID_HEADER,
};
use jobrelay_core::InvocationCandidate;
use serde::Serialize;
use serde_json::Value;

use crate::auth::JobCaller;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Body of a `202 Accepted` answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedJob {
    pub message: &'static str,
    pub job_id: String,
    pub schedule_id: String,
    pub run_id: String,
}

/// Body of a successful synchronous run.
#[derive(Debug, Serialize)]
pub struct SyncJobResult {
    pub success: bool,
    pub result: Value,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read an optional header as a string, ignoring non-UTF-8 values.
fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Parse the request body as JSON. An empty body is a `null` payload.
fn parse_payload(body: &Bytes) -> AppResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Request body is not valid JSON: {e}")))
}

/// Build an invocation candidate from the scheduler headers and body.
pub fn candidate_from_request(headers: &HeaderMap, payload: Value) -> InvocationCandidate {
    InvocationCandidate {
        job_id: header(headers, JOB_ID_HEADER),
        schedule_id: header(headers, SCHEDULE_ID_HEADER),
        run_id: header(headers, RUN_ID_HEADER),
        scheduler_host: header(headers, SCHEDULER_HOST_HEADER),
        payload,
    }
}

// ---------------------------------------------------------------------------
// Async
// ---------------------------------------------------------------------------

/// POST /api/v1/async-job
///
/// Validate the scheduler headers, acknowledge with `202 Accepted`, and run
/// the job in the background once the acknowledgment body exists. Missing
/// headers produce `400` and nothing runs.
pub async fn async_job(
    _caller: JobCaller,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let candidate = candidate_from_request(&headers, parse_payload(&body)?);
    let ack = state.dispatcher.accept(candidate)?;

    let body = AcceptedJob {
        message: "Job accepted for processing",
        job_id: ack.job_id.clone(),
        schedule_id: ack.schedule_id.clone(),
        run_id: ack.run_id.clone(),
    };
    // Releases the background run.
    drop(ack);

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: body })))
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// POST /api/v1/sync-job
///
/// Run the job inline for short tasks. Returns `200` with the result, or
/// `500` with the failure reason. No run-log report is sent; the HTTP status
/// is the outcome.
pub async fn sync_job(
    _caller: JobCaller,
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<DataResponse<SyncJobResult>>> {
    let payload = parse_payload(&body)?;

    tracing::info!("Processing synchronous job");
    match state.dispatcher.run_work(payload).await {
        Ok(result) => Ok(Json(DataResponse {
            data: SyncJobResult {
                success: true,
                result,
            },
        })),
        Err(err) => {
            tracing::error!(error = %err, "Sync job failed");
            Err(AppError::JobFailed(err.to_string()))
        }
    }
}
