use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobrelay_api::auth::{AllowAll, Authorizer, StaticBearer};
use jobrelay_api::config::ServerConfig;
use jobrelay_api::router::build_app_router;
use jobrelay_api::state::AppState;
use jobrelay_api::work::SimulatedWork;
use jobrelay_runlog::{RunLogConfig, RunReporter};
use jobrelay_worker::{Dispatcher, DispatcherConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jobrelay_api=debug,jobrelay_worker=debug,jobrelay_runlog=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Run reporter ---
    let run_log = RunLogConfig::from_env();
    if run_log.is_none() {
        tracing::warn!("RUN_LOG_URL not set; job outcomes will only be logged");
    }
    let reporter = RunReporter::from_config(run_log).expect("Invalid run-log configuration");
    tracing::info!(sink = reporter.sink_name(), "Run reporter ready");

    // --- Dispatcher ---
    let dispatcher_config = DispatcherConfig::from_env();
    tracing::info!(
        timeout_secs = dispatcher_config.timeout.map(|t| t.as_secs()),
        "Loaded dispatcher configuration"
    );
    let work = SimulatedWork::new(Duration::from_millis(config.simulated_work_ms));
    let dispatcher = Dispatcher::new(Arc::new(work), reporter, dispatcher_config);

    // --- Authorization gate ---
    let authorizer: Arc<dyn Authorizer> = match &config.auth_token {
        Some(token) => Arc::new(StaticBearer::new(token.clone())),
        None => {
            tracing::warn!("JOB_AUTH_TOKEN not set; job endpoints are unauthenticated");
            Arc::new(AllowAll)
        }
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        dispatcher: dispatcher.clone(),
        authorizer,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining job runs");

    let drained = dispatcher
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    if !drained {
        tracing::warn!("Some job runs were abandoned and will not be reported");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
