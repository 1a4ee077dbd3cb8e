//! Bundled demo work unit.
//!
//! Stands in for real business logic so the service can be exercised end to
//! end against a scheduler. Replace it by passing your own
//! [`WorkUnit`] to [`Dispatcher::new`](jobrelay_worker::Dispatcher::new).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jobrelay_worker::WorkUnit;
use serde_json::{json, Value};

/// Sleeps for a fixed duration, then reports how many records it "processed".
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    pub duration: Duration,
}

impl SimulatedWork {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl WorkUnit for SimulatedWork {
    async fn execute(&self, payload: Value) -> anyhow::Result<Value> {
        tracing::debug!(%payload, "Processing data");
        tokio::time::sleep(self.duration).await;

        let records = match &payload {
            Value::Null => 0,
            Value::Array(items) => items.len(),
            Value::Object(fields) => fields.len(),
            _ => 1,
        };

        Ok(json!({
            "processed": true,
            "recordsProcessed": records,
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}
