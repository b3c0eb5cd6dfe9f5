//! Tombstone handling in both directions
//!
//! Remote tombstones (trashed or removed remote files) are applied locally
//! by soft-deleting into the `.trash` directory, never by destroying the
//! only copy of a note. A tombstone that collides with a newer local edit
//! loses: the record detaches from the remote file and the edit re-uploads
//! as a new note. Local deletions propagate to the remote side according
//! to the user's delete policy.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use notedrive_core::domain::{DriveId, RelPath, RemoteDeletePolicy, SyncItem};
use notedrive_core::ports::{LocalFsGateway, StorageUnavailable, SyncStore};

use crate::conflict::timestamped_name;
use crate::executor::SyncOperation;
use crate::filter::{self, TRASH_DIR_NAME};

/// Result of soft-deleting a local file into `.trash`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrashMoveResult {
    /// The file now lives at this path inside `.trash`
    Moved(RelPath),
    /// There was no local file to move
    Missing,
    /// The move failed; the file is still at its original path
    Failed,
}

/// Applies tombstones and propagates local deletions
pub struct DeleteResolver {
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
}

impl DeleteResolver {
    pub fn new(local: Arc<dyn LocalFsGateway>, store: Arc<dyn SyncStore>) -> Self {
        Self { local, store }
    }

    /// Applies a remote tombstone for the given remote id
    ///
    /// Resolves the id to a tracked folder or item; unknown ids are
    /// ignored (the note was never synced here). Folder tombstones apply
    /// to every tracked item underneath.
    pub async fn handle_remote_deletion(
        &self,
        file_id: &DriveId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(folder) = self.store.folder_by_drive_id(file_id).await? {
            return self.apply_folder_tombstone(&folder.local_path, now).await;
        }
        let item = match self.store.item_by_drive_id(file_id).await? {
            Some(item) => item,
            None => {
                debug!(remote_id = %file_id, "tombstone for untracked file, ignoring");
                return Ok(());
            }
        };
        if filter::is_ignored_path(&item.local_path) {
            // Already in local trash; just forget it
            return self.store.delete_item(&item.local_path).await;
        }
        self.apply_item_tombstone(item, now).await?;
        Ok(())
    }

    /// Tombstones every tracked item under a deleted remote folder
    async fn apply_folder_tombstone(&self, path: &RelPath, now: DateTime<Utc>) -> Result<()> {
        info!(path = %path, "applying remote folder tombstone");

        let mut retained = false;
        for item in self.store.items_with_path_prefix(path).await? {
            retained |= self.apply_item_tombstone(item, now).await?;
        }
        for folder in self.store.folders_with_path_prefix(path).await? {
            self.store.delete_folder(&folder.local_path).await?;
        }
        if !retained {
            self.local.delete_dir_if_empty(path).await?;
        }
        Ok(())
    }

    /// Applies a tombstone to one item; returns true if the local file
    /// was retained (newer edit wins, or the trash move failed)
    async fn apply_item_tombstone(&self, mut item: SyncItem, now: DateTime<Utc>) -> Result<bool> {
        let meta = self.local.file_meta(&item.local_path).await?;
        let edited_since_sync = meta
            .as_ref()
            .map(|m| item.locally_modified_since_sync(m.modified))
            .unwrap_or(false);

        if edited_since_sync {
            info!(path = %item.local_path, "remote delete lost to newer local edit");
            item.detach_from_remote();
            self.store.upsert_item(&item).await?;
            return Ok(true);
        }

        match self.move_local_to_trash(&item.local_path, now).await? {
            TrashMoveResult::Moved(trashed) => {
                info!(path = %item.local_path, trashed = %trashed, "applied remote tombstone");
                self.store.delete_item(&item.local_path).await?;
                Ok(false)
            }
            TrashMoveResult::Missing => {
                self.store.delete_item(&item.local_path).await?;
                Ok(false)
            }
            TrashMoveResult::Failed => {
                // Keep the content safe and queue a re-upload
                item.detach_from_remote();
                self.store.upsert_item(&item).await?;
                Ok(true)
            }
        }
    }

    /// Soft-deletes a local file into `.trash` under a timestamped name
    pub async fn move_local_to_trash(
        &self,
        path: &RelPath,
        now: DateTime<Utc>,
    ) -> Result<TrashMoveResult> {
        if !self.local.exists(path).await? {
            return Ok(TrashMoveResult::Missing);
        }

        let trash_dir = RelPath::new(TRASH_DIR_NAME)?;
        self.local.ensure_dir(&trash_dir).await?;
        let target = self
            .free_trash_path(&trash_dir, &timestamped_name(path.file_name(), "deleted", now))
            .await?;

        if let Err(err) = self.local.move_file(path, &target).await {
            if err.chain().any(|c| c.is::<StorageUnavailable>()) {
                return Err(err);
            }
            // Some storage backends can't move across directories; fall
            // back to copy-then-delete
            warn!(path = %path, error = %err, "trash move failed, trying copy");
            if let Err(err) = self.copy_then_delete(path, &target).await {
                if err.chain().any(|c| c.is::<StorageUnavailable>()) {
                    return Err(err);
                }
                warn!(path = %path, error = %err, "trash copy failed, keeping file");
                return Ok(TrashMoveResult::Failed);
            }
        }
        Ok(TrashMoveResult::Moved(target))
    }

    async fn copy_then_delete(&self, from: &RelPath, to: &RelPath) -> Result<()> {
        self.local.copy_file(from, to).await?;
        self.local.delete_file(from).await
    }

    /// Probes for an unoccupied name inside the trash directory
    async fn free_trash_path(&self, trash_dir: &RelPath, name: &str) -> Result<RelPath> {
        let desired = trash_dir.join(name)?;
        if !self.local.exists(&desired).await? {
            return Ok(desired);
        }
        let (stem, ext) = match name.rfind('.').filter(|&idx| idx > 0) {
            Some(idx) => (&name[..idx], &name[idx..]),
            None => (name, ""),
        };
        let mut attempt = 1u32;
        loop {
            let candidate = trash_dir.join(&format!("{stem} ({attempt}){ext}"))?;
            if !self.local.exists(&candidate).await? {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }

    /// Handles a tracked file that disappeared locally
    ///
    /// The record is always dropped. When the note has a remote
    /// counterpart and the policy allows, the matching remote delete is
    /// returned as an operation for the caller to execute after the whole
    /// local snapshot is processed.
    pub async fn handle_local_deletion(
        &self,
        item: &SyncItem,
        policy: RemoteDeletePolicy,
    ) -> Result<Option<SyncOperation>> {
        self.store.delete_item(&item.local_path).await?;

        let file_id = match &item.drive_file_id {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        if policy == RemoteDeletePolicy::Ignore {
            debug!(path = %item.local_path, "local delete not propagated (policy: ignore)");
            return Ok(None);
        }
        Ok(Some(SyncOperation::DeleteRemote {
            path: item.local_path.clone(),
            file_id,
            policy,
        }))
    }
}
