//! SyncFolder mapping and process-wide sync metadata
//!
//! `SyncFolder` records the bidirectional mapping between a remote folder id
//! and its local relative path. Every ancestor directory of a tracked
//! `SyncItem` should eventually have a record, but absence is tolerated:
//! path resolution falls back to fetching the remote parent chain on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{DriveId, PageToken, RelPath};

/// Mapping between a tracked local directory and its remote folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFolder {
    /// Local path relative to the sync root (unique key)
    pub local_path: RelPath,
    /// Remote folder id
    pub drive_folder_id: DriveId,
}

impl SyncFolder {
    pub fn new(local_path: RelPath, drive_folder_id: DriveId) -> Self {
        Self {
            local_path,
            drive_folder_id,
        }
    }
}

/// Process-wide sync bookkeeping singleton
///
/// A blank/missing `start_page_token` means no change-feed cursor exists yet
/// and the next run must perform a full initial sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    /// Id of the remote root folder all notes sync under
    pub drive_folder_id: Option<DriveId>,
    /// Display name of that folder at link time
    pub drive_folder_name: Option<String>,
    /// Change-feed cursor; `None` triggers initial sync
    pub start_page_token: Option<PageToken>,
    /// When the last full tree scan completed
    pub last_full_scan_at: Option<DateTime<Utc>>,
}

impl SyncMeta {
    /// Returns true if no usable change-feed cursor has been saved
    pub fn needs_initial_sync(&self) -> bool {
        self.start_page_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_initial_sync() {
        let mut meta = SyncMeta::default();
        assert!(meta.needs_initial_sync());

        meta.start_page_token = Some(PageToken::new("42").unwrap());
        assert!(!meta.needs_initial_sync());
    }

    #[test]
    fn test_folder_serde_roundtrip() {
        let folder = SyncFolder::new(
            RelPath::new("notes/work").unwrap(),
            DriveId::new("f1").unwrap(),
        );
        let json = serde_json::to_string(&folder).unwrap();
        let parsed: SyncFolder = serde_json::from_str(&json).unwrap();
        assert_eq!(folder, parsed);
    }
}
