//! End-to-end dispatcher behaviour: acknowledge first, execute in the
//! background, report exactly once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use jobrelay_core::{CoreError, InvocationCandidate, RequiredAttribute};
use jobrelay_runlog::{RunLogEntry, RunLogError, RunLogSink, RunReporter};
use jobrelay_worker::{work_fn, Dispatcher, DispatcherConfig, WorkUnit};
use serde_json::{json, Value};
use tokio::sync::oneshot;

const DRAIN: Duration = Duration::from_secs(5);

/// Sink that keeps every entry it is handed.
#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<RunLogEntry>>,
    fail: bool,
}

impl RecordingSink {
    fn entries(&self) -> Vec<RunLogEntry> {
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
        if self.fail {
            return Err(RunLogError::Rejected("offline".into()));
        }
        Ok(())
    }
}

fn build(work: impl WorkUnit + 'static, sink: Arc<RecordingSink>) -> Dispatcher {
    Dispatcher::new(
        Arc::new(work),
        RunReporter::new(sink),
        DispatcherConfig::default(),
    )
}

fn candidate(run_id: &str) -> InvocationCandidate {
    InvocationCandidate::new()
        .with_job_id("42")
        .with_schedule_id("S1")
        .with_run_id(run_id)
}

// ---------------------------------------------------------------------------
// Test: 42/S1/R1 with a 50ms work unit is acknowledged, then reported
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_success_is_acknowledged_then_reported() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = build(
        work_fn(|_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            anyhow::Ok(json!({ "processed": true }))
        }),
        sink.clone(),
    );

    let ack = dispatcher
        .accept(candidate("R1").with_payload(json!({ "x": 1 })))
        .unwrap();

    assert_eq!(ack.job_id, "42");
    assert_eq!(ack.run_id, "R1");
    assert!(sink.entries().is_empty(), "report must not precede the acknowledgment");

    drop(ack);
    assert!(dispatcher.shutdown(DRAIN).await);

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    let outcome = &entries[0].outcome;
    assert!(outcome.success);
    assert!(outcome.duration_ms >= 50, "duration was {}", outcome.duration_ms);
    assert!(outcome
        .message
        .contains(&format!("in {}ms", outcome.duration_ms)));
    assert!(outcome.message.contains(r#"{"processed":true}"#));
}

// ---------------------------------------------------------------------------
// Test: acknowledgment does not wait for the work unit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn acknowledgment_is_independent_of_work_duration() {
    let sink = Arc::new(RecordingSink::default());
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));

    let dispatcher = build(
        work_fn(move |_| {
            let release_rx = Arc::clone(&release_rx);
            async move {
                if let Some(rx) = release_rx.lock().await.take() {
                    let _ = rx.await;
                }
                anyhow::Ok(Value::Null)
            }
        }),
        sink.clone(),
    );

    dispatcher.accept(candidate("R1")).unwrap();

    // The work is blocked on `release_rx`, yet we already hold the ack.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(dispatcher.in_flight(), 1);
    assert!(sink.entries().is_empty());

    release_tx.send(()).unwrap();
    assert!(dispatcher.shutdown(DRAIN).await);
    assert_eq!(sink.entries().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: an instant work unit never reports while its acknowledgment is held
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn instant_work_waits_for_acknowledgment() {
    const RUNS: usize = 200;

    let sink = Arc::new(RecordingSink::default());
    let dispatcher = build(work_fn(|p| async move { anyhow::Ok(p) }), sink.clone());

    for n in 0..RUNS {
        let ack = dispatcher.accept(candidate(&format!("R{n}"))).unwrap();

        assert!(
            !sink.entries().iter().any(|e| e.run_id == ack.run_id),
            "{} reported before accept() returned",
            ack.run_id
        );
        // Give the worker threads a chance to run the parked task.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(
            !sink.entries().iter().any(|e| e.run_id == ack.run_id),
            "{} reported while its acknowledgment was held",
            ack.run_id
        );

        drop(ack);
    }

    assert!(dispatcher.shutdown(DRAIN).await);
    assert_eq!(sink.entries().len(), RUNS);
}

// ---------------------------------------------------------------------------
// Test: missing runId is rejected and never reported
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_run_id_is_rejected_without_report() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = build(work_fn(|p| async move { anyhow::Ok(p) }), sink.clone());

    let mut incomplete = candidate("unused");
    incomplete.run_id = None;

    assert_matches!(
        dispatcher.accept(incomplete),
        Err(CoreError::MissingAttributes(missing)) if missing.contains(&RequiredAttribute::RunId)
    );

    assert!(dispatcher.shutdown(DRAIN).await);
    assert!(sink.entries().is_empty());
}

// ---------------------------------------------------------------------------
// Test: a failing work unit is reported once with the failure reason
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failure_is_reported_once_with_reason() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = build(
        work_fn(|_| async { Err::<Value, _>(anyhow::anyhow!("quota exceeded")) }),
        sink.clone(),
    );

    dispatcher.accept(candidate("R1")).unwrap();
    assert!(dispatcher.shutdown(DRAIN).await);

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].outcome.success);
    assert!(entries[0].outcome.message.contains("quota exceeded"));
}

// ---------------------------------------------------------------------------
// Test: a panicking work unit is still reported once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn panic_is_reported_once() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = build(
        work_fn(|_| async {
            if true {
                panic!("bad state");
            }
            anyhow::Ok(Value::Null)
        }),
        sink.clone(),
    );

    dispatcher.accept(candidate("R1")).unwrap();
    assert!(dispatcher.shutdown(DRAIN).await);

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].outcome.success);
    assert!(entries[0].outcome.message.contains("bad state"));
}

// ---------------------------------------------------------------------------
// Test: a failing sink does not trigger a second attempt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_sink_is_called_once() {
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..Default::default()
    });
    let dispatcher = build(work_fn(|p| async move { anyhow::Ok(p) }), sink.clone());

    dispatcher.accept(candidate("R1")).unwrap();
    assert!(dispatcher.shutdown(DRAIN).await);

    assert_eq!(sink.entries().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: concurrent invocations each produce one report with their own data
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_do_not_leak() {
    const RUNS: usize = 50;

    let sink = Arc::new(RecordingSink::default());
    let dispatcher = build(
        work_fn(|payload: Value| async move {
            let n = payload["n"].as_u64().unwrap_or_default();
            tokio::time::sleep(Duration::from_millis(n % 7)).await;
            anyhow::Ok(json!({ "echo": n }))
        }),
        sink.clone(),
    );

    let mut acks = Vec::with_capacity(RUNS);
    for n in 0..RUNS {
        let ack = dispatcher
            .accept(candidate(&format!("R{n}")).with_payload(json!({ "n": n })))
            .unwrap();
        acks.push(ack);
    }
    assert_eq!(acks.len(), RUNS);
    drop(acks);

    assert!(dispatcher.shutdown(DRAIN).await);

    let mut entries = sink.entries();
    assert_eq!(entries.len(), RUNS);
    entries.sort_by_key(|e| e.run_id[1..].parse::<usize>().unwrap());

    for (n, entry) in entries.iter().enumerate() {
        assert_eq!(entry.run_id, format!("R{n}"));
        assert!(entry.outcome.success);
        assert!(
            entry.outcome.message.ends_with(&format!(r#"{{"echo":{n}}}"#)),
            "run R{n} got {}",
            entry.outcome.message
        );
    }
}
