pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /async-job        POST  accept, acknowledge, run in background
/// /sync-job         POST  run inline, answer with the result
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
