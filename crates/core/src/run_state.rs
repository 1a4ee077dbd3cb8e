//! Per-invocation lifecycle.
//!
//! ```text
//! Received -> Validated -> Acknowledged -> Executing -> Completed -> Reported
//!                                                   \-> Failed    -/
//! Received -> Rejected
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Received,
    Validated,
    Rejected,
    Acknowledged,
    Executing,
    Completed,
    Failed,
    Reported,
}

impl RunState {
    /// States reachable from `self` in one step.
    ///
    /// `Rejected` and `Reported` are terminal and return an empty slice.
    pub fn valid_transitions(self) -> &'static [RunState] {
        use RunState::*;
        match self {
            Received => &[Validated, Rejected],
            Validated => &[Acknowledged],
            Acknowledged => &[Executing],
            Executing => &[Completed, Failed],
            Completed | Failed => &[Reported],
            Rejected | Reported => &[],
        }
    }

    pub fn can_transition(self, to: RunState) -> bool {
        self.valid_transitions().contains(&to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
            Self::Acknowledged => "acknowledged",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Reported => "reported",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
