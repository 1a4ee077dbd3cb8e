//! The work-unit capability.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

/// Domain-specific work run for each accepted invocation.
///
/// Receives the invocation payload and produces a JSON result or an error.
/// The dispatcher does not care what the work does; errors, panics and
/// timeouts are all turned into a failed outcome at its boundary.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    async fn execute(&self, payload: Value) -> anyhow::Result<Value>;
}

/// [`WorkUnit`] backed by an async closure. Build one with [`work_fn`].
pub struct FnWork<F>(F);

/// Wrap an async closure as a [`WorkUnit`].
///
/// ```ignore
/// let work = work_fn(|payload| async move { Ok(json!({ "echo": payload })) });
/// ```
pub fn work_fn<F, Fut>(f: F) -> FnWork<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    FnWork(f)
}

#[async_trait]
impl<F, Fut> WorkUnit for FnWork<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn execute(&self, payload: Value) -> anyhow::Result<Value> {
        (self.0)(payload).await
    }
}
