//! Route definitions for scheduler-triggered jobs.
//!
//! All endpoints pass through the configured authorization gate.

use axum::routing::post;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted under `/api/v1`.
///
/// ```text
/// POST   /async-job       -> async_job
/// POST   /sync-job        -> sync_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/async-job", post(jobs::async_job))
        .route("/sync-job", post(jobs::sync_job))
}
