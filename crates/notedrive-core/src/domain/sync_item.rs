//! SyncItem domain entity
//!
//! One `SyncItem` per tracked local file, keyed by its local relative path.
//! The record carries both sides' last observed metadata plus the
//! `last_synced_at` high-water mark; both local and remote changes are
//! compared against that mark to detect "changed since last agreement".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::newtypes::{DriveId, RelPath};

// ============================================================================
// SyncState
// ============================================================================

/// Synchronization state of a tracked file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Local and remote agree as of `last_synced_at`
    #[default]
    Synced,
    /// The file must be (re-)uploaded on the next push pass
    ///
    /// Also the recovery state used when a trash-move fails or a remote
    /// delete collides with a newer local edit: the record is kept with
    /// `drive_file_id = None` so push re-creates the remote file.
    PendingUpload,
    /// The remote side is newer and a download is outstanding
    PendingDownload,
    /// A conflict copy; intentionally not linked to any remote file
    Conflict,
    /// The last sync attempt for this file failed
    Error,
}

impl SyncState {
    /// Returns the state name as a string
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Synced => "Synced",
            SyncState::PendingUpload => "PendingUpload",
            SyncState::PendingDownload => "PendingDownload",
            SyncState::Conflict => "Conflict",
            SyncState::Error => "Error",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Synced => write!(f, "synced"),
            SyncState::PendingUpload => write!(f, "pending_upload"),
            SyncState::PendingDownload => write!(f, "pending_download"),
            SyncState::Conflict => write!(f, "conflict"),
            SyncState::Error => write!(f, "error"),
        }
    }
}

// ============================================================================
// SyncItem
// ============================================================================

/// Bookkeeping row for one tracked local file
///
/// Rows are created on first successful upload/download/walk observation and
/// updated on every successful pass touching the path. Paths are never
/// mutated in place: a rename/move deletes the old key and inserts the new
/// one, keeping the key space consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    /// Local path relative to the sync root (unique key)
    pub local_path: RelPath,
    /// Last observed local modification time
    pub local_modified: DateTime<Utc>,
    /// Last observed local size in bytes
    pub local_size: u64,
    /// Content digest, lazily computed only when (mtime, size) changed
    pub local_hash: Option<String>,
    /// Remote file id; `None` means not yet uploaded, or deliberately
    /// unlinked after a remote delete
    pub drive_file_id: Option<DriveId>,
    /// Last observed remote modification time
    pub drive_modified: Option<DateTime<Utc>>,
    /// High-water mark of the last local/remote agreement
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Current sync state
    pub state: SyncState,
    /// Message of the last per-file failure, if any
    pub last_error: Option<String>,
}

impl SyncItem {
    /// Creates a fully-synced record after a successful transfer
    #[allow(clippy::too_many_arguments)]
    pub fn synced(
        local_path: RelPath,
        local_modified: DateTime<Utc>,
        local_size: u64,
        local_hash: Option<String>,
        drive_file_id: DriveId,
        drive_modified: Option<DateTime<Utc>>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            local_path,
            local_modified,
            local_size,
            local_hash,
            drive_file_id: Some(drive_file_id),
            drive_modified,
            last_synced_at: Some(synced_at),
            state: SyncState::Synced,
            last_error: None,
        }
    }

    /// Creates a record for a local file awaiting its first upload
    pub fn pending_upload(
        local_path: RelPath,
        local_modified: DateTime<Utc>,
        local_size: u64,
        local_hash: Option<String>,
    ) -> Self {
        Self {
            local_path,
            local_modified,
            local_size,
            local_hash,
            drive_file_id: None,
            drive_modified: None,
            last_synced_at: None,
            state: SyncState::PendingUpload,
            last_error: None,
        }
    }

    /// Severs the link to the remote file and queues a re-upload
    ///
    /// Used when a remote tombstone collides with a newer local edit, or a
    /// trash-move fails: the local content is preserved and pushed again on
    /// the next pass.
    pub fn detach_from_remote(&mut self) {
        self.drive_file_id = None;
        self.drive_modified = None;
        self.state = SyncState::PendingUpload;
    }

    /// Returns true if the local file changed after the last agreement
    ///
    /// With no recorded agreement, any local timestamp counts as a change.
    pub fn locally_modified_since_sync(&self, local_modified: DateTime<Utc>) -> bool {
        match self.last_synced_at {
            Some(mark) => local_modified > mark,
            None => true,
        }
    }

    /// Returns true if the remote file changed after the last agreement
    pub fn remotely_modified_since_sync(&self, remote_modified: DateTime<Utc>) -> bool {
        match self.last_synced_at {
            Some(mark) => remote_modified > mark,
            None => true,
        }
    }
}
