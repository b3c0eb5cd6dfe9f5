//! Closed result sums for the engine and the host worker
//!
//! Both types are deliberately exhaustive tagged unions: exhaustiveness at
//! compile time is the safety property callers rely on when mapping engine
//! outcomes to host retry policy.

use serde::{Deserialize, Serialize};

/// Engine-facing result of one sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The run completed and both replicas agree
    Success,
    /// Preflight short-circuited (sync disabled or paused)
    Skipped,
    /// The run failed terminally
    Failure {
        /// True when the failure requires re-authentication by the user
        auth_error: bool,
    },
}

impl SyncOutcome {
    /// Returns true for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success)
    }
}

/// Worker-facing decision fed to the host's job-retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerDecision {
    /// The job finished; do not reschedule
    Success,
    /// Transient failure; the host should retry with backoff
    Retry,
    /// Terminal failure; retrying without user action is pointless
    Failure,
}
