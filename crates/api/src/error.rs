use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobrelay_core::error::CoreError;
use jobrelay_core::RequiredAttribute;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `jobrelay_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A synchronously executed job failed. The reason is returned to the
    /// caller verbatim.
    #[error("Job failed: {0}")]
    JobFailed(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::MissingAttributes(missing) => {
                    return missing_attributes_response(missing);
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::JobFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "JOB_FAILED", msg.clone())
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 400 listing the missing attributes both by field name and by header.
fn missing_attributes_response(missing: &[RequiredAttribute]) -> Response {
    let required: Vec<_> = missing.iter().map(|a| a.field_name()).collect();
    let headers: Vec<_> = missing.iter().map(|a| a.header_name()).collect();

    let body = json!({
        "error": "Missing required job headers",
        "code": "MISSING_JOB_HEADERS",
        "required": required,
        "headers": headers,
    });

    (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
}
