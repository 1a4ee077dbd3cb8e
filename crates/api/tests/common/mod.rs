#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use jobrelay_api::auth::{AllowAll, Authorizer};
use jobrelay_api::config::ServerConfig;
use jobrelay_api::router::build_app_router;
use jobrelay_api::state::AppState;
use jobrelay_runlog::{RunLogEntry, RunLogError, RunLogSink, RunReporter};
use jobrelay_worker::{Dispatcher, DispatcherConfig, WorkUnit};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        auth_token: None,
        simulated_work_ms: 0,
    }
}

/// Run-log sink that records every entry in memory.
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<RunLogEntry>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<RunLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunLogSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn update_run_log(&self, entry: &RunLogEntry) -> Result<(), RunLogError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Everything a test needs to drive the service and observe reports.
pub struct TestApp {
    pub router: Router,
    pub dispatcher: Dispatcher,
    pub sink: Arc<RecordingSink>,
}

/// Build the full application router around `work`, with no auth gate.
pub fn build_test_app(work: impl WorkUnit + 'static) -> TestApp {
    build_test_app_with(work, Arc::new(AllowAll), DispatcherConfig::default())
}

/// Build the full application router with a specific gate and policy.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app_with(
    work: impl WorkUnit + 'static,
    authorizer: Arc<dyn Authorizer>,
    dispatcher_config: DispatcherConfig,
) -> TestApp {
    let config = test_config();
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = Dispatcher::new(
        Arc::new(work),
        RunReporter::new(sink.clone()),
        dispatcher_config,
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        dispatcher: dispatcher.clone(),
        authorizer,
    };

    TestApp {
        router: build_app_router(state, &config),
        dispatcher,
        sink,
    }
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with the given headers and raw body.
pub async fn post(app: Router, uri: &str, headers: &[(&str, &str)], body: &str) -> Response<Body> {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The three scheduler headers for job 42 / schedule S1 / `run_id`.
pub fn job_headers(run_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("x-sap-job-id", "42".to_string()),
        ("x-sap-job-schedule-id", "S1".to_string()),
        ("x-sap-job-run-id", run_id.to_string()),
    ]
}

/// Borrow owned header pairs for [`post`].
pub fn as_refs<'a>(headers: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    headers.iter().map(|(n, v)| (*n, v.as_str())).collect()
}
