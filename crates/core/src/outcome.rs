//! Terminal result of one job run.

use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on [`JobOutcome::message`], in characters.
pub const MAX_OUTCOME_MESSAGE_LEN: usize = 4096;

/// Suffix appended to messages cut at [`MAX_OUTCOME_MESSAGE_LEN`].
const TRUNCATION_MARKER: char = '…';

/// Success or failure of a work-unit execution.
///
/// Created exactly once per invocation, at the end of execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub success: bool,
    pub message: String,
    pub duration_ms: u64,
}

impl JobOutcome {
    /// Outcome for a work unit that returned `result`.
    pub fn completed(elapsed: Duration, result: &Value) -> Self {
        let duration_ms = millis(elapsed);
        Self {
            success: true,
            message: bounded(format!(
                "Job completed successfully in {duration_ms}ms. Result: {result}"
            )),
            duration_ms,
        }
    }

    /// Outcome for a work unit that failed, panicked or timed out.
    pub fn failed(elapsed: Duration, reason: impl Display) -> Self {
        let duration_ms = millis(elapsed);
        Self {
            success: false,
            message: bounded(format!("Job failed after {duration_ms}ms: {reason}")),
            duration_ms,
        }
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Cut `message` to at most [`MAX_OUTCOME_MESSAGE_LEN`] chars.
fn bounded(message: String) -> String {
    match message.char_indices().nth(MAX_OUTCOME_MESSAGE_LEN - 1) {
        Some((idx, _)) if message.chars().count() > MAX_OUTCOME_MESSAGE_LEN => {
            let mut cut = message[..idx].to_string();
            cut.push(TRUNCATION_MARKER);
            cut
        }
        _ => message,
    }
}
