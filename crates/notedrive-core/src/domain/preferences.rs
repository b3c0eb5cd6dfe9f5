//! Sync preferences
//!
//! The host app owns preference storage; the engine reads a snapshot of
//! these values through the `PrefsGateway` port at the start of every run.

use serde::{Deserialize, Serialize};

/// What to do with the remote counterpart of a locally deleted file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteDeletePolicy {
    /// Move the remote file to the drive's trash (recoverable)
    #[default]
    Trash,
    /// Permanently delete the remote file
    Delete,
    /// Leave the remote file untouched
    Ignore,
}

/// Snapshot of the user's sync configuration
///
/// `wifi_only`, `charging_only` and `auto_sync_on_start` are scheduling
/// hints for the host's job runner; the engine itself only consults
/// `enabled`, `paused`, `local_root`, `drive_folder_name` and the two
/// delete-policy fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPreferences {
    /// Master switch for drive sync
    pub enabled: bool,
    /// Temporarily paused by the user
    pub paused: bool,
    /// Opaque handle/URI of the local root folder; `None` means unconfigured
    pub local_root: Option<String>,
    /// Display name of the remote folder to link against
    pub drive_folder_name: String,
    /// How local deletions propagate to the remote side
    pub remote_delete_policy: RemoteDeletePolicy,
    /// When set, remote tombstones are not applied locally
    pub ignore_remote_deletes: bool,
    /// Host hint: trigger a sync when the app starts
    pub auto_sync_on_start: bool,
    /// Host hint: only run on unmetered networks
    pub wifi_only: bool,
    /// Host hint: only run while charging
    pub charging_only: bool,
}

impl Default for SyncPreferences {
    fn default() -> Self {
        Self {
            enabled: false,
            paused: false,
            local_root: None,
            drive_folder_name: "NoteDrive".to_string(),
            remote_delete_policy: RemoteDeletePolicy::Trash,
            ignore_remote_deletes: false,
            auto_sync_on_start: false,
            wifi_only: false,
            charging_only: false,
        }
    }
}
