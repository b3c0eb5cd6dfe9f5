//! Sync store gateway port
//!
//! Durable persistence of sync bookkeeping: item and folder records, the
//! process-wide meta row, and the UI-facing status. The store exclusively
//! owns this state; use cases read/write through it and never cache
//! authoritative state beyond a single run.

use chrono::{DateTime, Utc};

use crate::domain::{
    DriveId, PageToken, RelPath, SyncFolder, SyncItem, SyncMeta, SyncStatusState,
};

/// Port trait for persistent sync bookkeeping
///
/// ## Implementation Notes
///
/// - `upsert_*` replaces any existing record with the same path key.
/// - Prefix queries match the path itself and everything beneath it
///   with `prefix/` boundary semantics: `a/b` must not match `a/bc.md`.
#[async_trait::async_trait]
pub trait SyncStore: Send + Sync {
    // --- SyncItem operations ---

    /// Inserts or replaces an item record keyed by its local path
    async fn upsert_item(&self, item: &SyncItem) -> anyhow::Result<()>;

    /// Fetches an item by local path
    async fn item_by_path(&self, path: &RelPath) -> anyhow::Result<Option<SyncItem>>;

    /// Fetches an item by its linked remote id
    async fn item_by_drive_id(&self, drive_id: &DriveId) -> anyhow::Result<Option<SyncItem>>;

    /// Fetches all items whose path lies under the given directory
    async fn items_with_path_prefix(&self, prefix: &RelPath) -> anyhow::Result<Vec<SyncItem>>;

    /// Fetches every item record
    async fn all_items(&self) -> anyhow::Result<Vec<SyncItem>>;

    /// Deletes the item record at the given path (no-op if absent)
    async fn delete_item(&self, path: &RelPath) -> anyhow::Result<()>;

    // --- SyncFolder operations ---

    /// Inserts or replaces a folder mapping keyed by its local path
    async fn upsert_folder(&self, folder: &SyncFolder) -> anyhow::Result<()>;

    /// Fetches a folder mapping by local path
    async fn folder_by_path(&self, path: &RelPath) -> anyhow::Result<Option<SyncFolder>>;

    /// Fetches a folder mapping by remote folder id
    async fn folder_by_drive_id(&self, drive_id: &DriveId)
        -> anyhow::Result<Option<SyncFolder>>;

    /// Fetches all folder mappings under the given directory
    async fn folders_with_path_prefix(&self, prefix: &RelPath)
        -> anyhow::Result<Vec<SyncFolder>>;

    /// Fetches every folder mapping
    async fn all_folders(&self) -> anyhow::Result<Vec<SyncFolder>>;

    /// Deletes the folder mapping at the given path (no-op if absent)
    async fn delete_folder(&self, path: &RelPath) -> anyhow::Result<()>;

    // --- Meta operations ---

    /// Fetches the process-wide meta row
    async fn meta(&self) -> anyhow::Result<SyncMeta>;

    /// Persists the linked remote root folder identity
    async fn set_drive_folder(&self, id: &DriveId, name: &str) -> anyhow::Result<()>;

    /// Persists the change-feed cursor
    async fn set_start_page_token(&self, token: &PageToken) -> anyhow::Result<()>;

    /// Persists the timestamp of the last full tree scan
    async fn set_last_full_scan_at(&self, at: DateTime<Utc>) -> anyhow::Result<()>;

    // --- Status ---

    /// Updates the durable UI-facing status row
    async fn set_status(
        &self,
        state: SyncStatusState,
        message: Option<String>,
        last_synced_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()>;
}
