//! Incremental local-to-remote pass
//!
//! One full local-tree snapshot per run; a full stat pass is cheap next to
//! any remote round trip, so there is no local watch mechanism. Content
//! hashes are only recomputed when (mtime, size) changed since the stored
//! record.
//!
//! Ordering invariant: every upload executes before any remote delete is
//! issued. A local-fs failure (including `StorageUnavailable`) therefore
//! aborts the pass before a bogus "everything was deleted" snapshot can
//! wipe remote data.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use notedrive_core::domain::{RelPath, SyncItem, SyncState};
use notedrive_core::ports::{DriveGateway, LocalFileMeta, LocalFsGateway, SyncStore};

use crate::conflict::ConflictResolver;
use crate::deletes::DeleteResolver;
use crate::engine::RunStats;
use crate::executor::{OpResult, SyncExecutor, SyncOperation};
use crate::filter;
use crate::path_resolver::FolderPathResolver;
use crate::preflight::SyncContext;

/// Steady-state push pass
pub struct IncrementalPushUseCase {
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
    drive: Arc<dyn DriveGateway>,
    conflicts: ConflictResolver,
    deletes: DeleteResolver,
    executor: SyncExecutor,
}

impl IncrementalPushUseCase {
    pub fn new(
        drive: Arc<dyn DriveGateway>,
        local: Arc<dyn LocalFsGateway>,
        store: Arc<dyn SyncStore>,
    ) -> Self {
        let conflicts = ConflictResolver::new(drive.clone(), local.clone(), store.clone());
        let deletes = DeleteResolver::new(local.clone(), store.clone());
        let executor = SyncExecutor::new(drive.clone(), local.clone(), store.clone());
        Self {
            local,
            store,
            drive,
            conflicts,
            deletes,
            executor,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn run(
        &self,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<RunStats> {
        let root_id = &ctx.drive_folder_id;
        let local_files: Vec<LocalFileMeta> = self
            .local
            .list_files()
            .await
            .context("snapshotting local tree")?
            .into_iter()
            .filter(|m| filter::is_supported_path(&m.path) && !filter::is_ignored_path(&m.path))
            .collect();

        let mut stored: HashMap<RelPath, SyncItem> = self
            .store
            .all_items()
            .await?
            .into_iter()
            .map(|item| (item.local_path.clone(), item))
            .collect();
        debug!(local = local_files.len(), tracked = stored.len(), "push snapshots");

        let mut stats = RunStats::default();
        let mut uploads: Vec<SyncOperation> = Vec::new();
        for meta in local_files {
            let item = stored.remove(&meta.path);
            if let Some(op) = self.plan_upload(meta, item, &mut stats).await? {
                uploads.push(op);
            }
        }

        let results = self.executor.execute(uploads, resolver, root_id).await?;
        stats.uploaded = results
            .iter()
            .filter(|(_, r)| *r == OpResult::Done)
            .count() as u32;

        // Only reached with a trustworthy local snapshot: everything left
        // in `stored` really is gone locally
        let mut removals: Vec<SyncOperation> = Vec::new();
        for item in stored.into_values() {
            if let Some(op) = self
                .deletes
                .handle_local_deletion(&item, ctx.prefs.remote_delete_policy)
                .await?
            {
                removals.push(op);
            }
        }
        let results = self.executor.execute(removals, resolver, root_id).await?;
        stats.deleted = results
            .iter()
            .filter(|(_, r)| *r == OpResult::Done)
            .count() as u32;

        info!(
            uploaded = stats.uploaded,
            deleted = stats.deleted,
            conflicts = stats.conflicts,
            "push pass complete"
        );
        Ok(stats)
    }

    /// Decides whether one local file needs uploading, materializing a
    /// conflict copy first when both sides diverged since last agreement
    async fn plan_upload(
        &self,
        meta: LocalFileMeta,
        item: Option<SyncItem>,
        stats: &mut RunStats,
    ) -> Result<Option<SyncOperation>> {
        // Rehash only when (mtime, size) moved; unchanged files keep the
        // stored digest
        let unchanged_stat = item
            .as_ref()
            .map(|i| i.local_modified == meta.modified && i.local_size == meta.size)
            .unwrap_or(false);
        let (hash, hash_changed) = if unchanged_stat {
            (item.as_ref().and_then(|i| i.local_hash.clone()), false)
        } else {
            let hash = self
                .local
                .compute_hash(&meta.path)
                .await
                .with_context(|| format!("hashing {}", meta.path))?;
            let changed = item
                .as_ref()
                .map(|i| i.local_hash.as_deref() != Some(hash.as_str()))
                .unwrap_or(true);
            (Some(hash), changed)
        };

        let should_upload = match &item {
            None => true,
            Some(item) => {
                hash_changed
                    || item.drive_file_id.is_none()
                    || item.state == SyncState::PendingUpload
            }
        };
        if !should_upload {
            return Ok(None);
        }

        if let Some(item) = &item {
            if self.is_true_conflict(item, &meta) {
                self.materialize_remote_conflict(item, stats).await?;
            }
        }

        Ok(Some(SyncOperation::Upload {
            path: meta.path.clone(),
            meta,
            hash,
            known_remote: None,
        }))
    }

    /// Both replicas changed since the last agreement
    fn is_true_conflict(&self, item: &SyncItem, meta: &LocalFileMeta) -> bool {
        let Some(mark) = item.last_synced_at else {
            return false;
        };
        item.drive_file_id.is_some()
            && meta.modified > mark
            && item.drive_modified.map(|m| m > mark).unwrap_or(false)
    }

    /// Saves the divergent remote version as a sibling before the local
    /// edit takes the canonical path
    async fn materialize_remote_conflict(
        &self,
        item: &SyncItem,
        stats: &mut RunStats,
    ) -> Result<()> {
        let Some(file_id) = &item.drive_file_id else {
            return Ok(());
        };
        let remote = self
            .drive
            .file_metadata(file_id)
            .await
            .with_context(|| format!("fetching conflicting remote metadata for {}", item.local_path))?;
        match remote.filter(|f| !f.trashed) {
            Some(remote) => {
                if self
                    .conflicts
                    .create_conflict_copy_from_remote(&item.local_path, &remote, Utc::now())
                    .await?
                    .is_some()
                {
                    stats.conflicts += 1;
                }
            }
            None => {
                warn!(path = %item.local_path, "conflicting remote file is gone, uploading local");
            }
        }
        Ok(())
    }
}
