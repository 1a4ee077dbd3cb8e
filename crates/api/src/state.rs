use std::sync::Arc;

use jobrelay_worker::Dispatcher;

use crate::auth::Authorizer;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Accepts invocations and runs them in the background.
    pub dispatcher: Dispatcher,
    /// Gate applied to job endpoints before any validation.
    pub authorizer: Arc<dyn Authorizer>,
}
