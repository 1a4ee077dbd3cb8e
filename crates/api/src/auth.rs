//! Authorization gate for job endpoints.
//!
//! Token validation belongs to the platform the service is deployed on, so
//! this module only defines the seam ([`Authorizer`]) plus two small
//! implementations: [`AllowAll`] for local development and [`StaticBearer`]
//! for a shared secret configured via `JOB_AUTH_TOKEN`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jobrelay_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Decides whether a request may trigger a job.
///
/// Return [`CoreError::Unauthorized`] for absent or invalid credentials and
/// [`CoreError::Forbidden`] for valid credentials without permission.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), CoreError>;
}

/// Lets every request through.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _headers: &HeaderMap) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Requires `Authorization: Bearer <token>` matching a shared secret.
#[derive(Clone)]
pub struct StaticBearer {
    token: String,
}

impl StaticBearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticBearer").finish_non_exhaustive()
    }
}

impl Authorizer for StaticBearer {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), CoreError> {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                CoreError::Unauthorized("Missing or invalid authorization header".into())
            })?;

        if !constant_time_eq(token.as_bytes(), self.token.as_bytes()) {
            return Err(CoreError::Unauthorized("Invalid token".into()));
        }
        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extractor proving the request passed the configured [`Authorizer`].
///
/// Add it as the first parameter of any handler that triggers work:
///
/// ```ignore
/// async fn my_handler(_caller: JobCaller, State(state): State<AppState>) { /* ... */ }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JobCaller;

impl FromRequestParts<AppState> for JobCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state.authorizer.authorize(&parts.headers).map_err(|err| {
            tracing::warn!(error = %err, "Job request not authorized");
            AppError::Core(err)
        })?;
        Ok(JobCaller)
    }
}
