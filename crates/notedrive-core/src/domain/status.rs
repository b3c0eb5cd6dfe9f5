//! Durable sync status
//!
//! Every terminal classification updates this row before the engine
//! returns, so the UI can always render the latest reason without
//! re-deriving it from logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse state shown to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatusState {
    /// Sync is disabled
    #[default]
    Idle,
    /// Sync is paused and will resume later
    Pending,
    /// A run is in progress
    Running,
    /// The last run completed successfully
    Synced,
    /// The last run failed
    Error,
}

impl fmt::Display for SyncStatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatusState::Idle => write!(f, "idle"),
            SyncStatusState::Pending => write!(f, "pending"),
            SyncStatusState::Running => write!(f, "running"),
            SyncStatusState::Synced => write!(f, "synced"),
            SyncStatusState::Error => write!(f, "error"),
        }
    }
}

/// Durable status row written through the sync store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncStatusState,
    /// Human-readable reason, e.g. "Sign in required"
    pub message: Option<String>,
    /// Timestamp of the last successful run
    pub last_synced_at: Option<DateTime<Utc>>,
}
