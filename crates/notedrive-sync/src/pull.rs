//! Incremental remote-to-local pass
//!
//! Driven by the change-feed cursor: fetch change pages, apply every entry
//! in order, and persist the last non-blank `new_start_page_token` seen
//! across the whole page sequence. Applying a change never destroys local
//! content: tombstones go through the delete resolver's trash machinery
//! and diverged files produce conflict copies.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use tracing::{debug, info, warn};

use notedrive_core::domain::{DriveId, PageToken, RelPath, SyncFolder, SyncItem, SyncState};
use notedrive_core::ports::{
    DriveGateway, LocalFsGateway, RemoteFile, SyncStore, APP_PROPERTY_LOCAL_PATH,
    APP_PROPERTY_MARKER,
};

use crate::conflict::ConflictResolver;
use crate::deletes::DeleteResolver;
use crate::engine::RunStats;
use crate::executor::{SyncExecutor, SyncOperation};
use crate::filter;
use crate::path_resolver::{FolderPathResolver, ResolvedDir};
use crate::preflight::SyncContext;
use crate::tree_walker::RemoteTreeWalker;

/// Steady-state pull pass
pub struct IncrementalPullUseCase {
    drive: Arc<dyn DriveGateway>,
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
    conflicts: ConflictResolver,
    deletes: DeleteResolver,
    walker: RemoteTreeWalker,
    executor: SyncExecutor,
}

impl IncrementalPullUseCase {
    pub fn new(
        drive: Arc<dyn DriveGateway>,
        local: Arc<dyn LocalFsGateway>,
        store: Arc<dyn SyncStore>,
    ) -> Self {
        let conflicts = ConflictResolver::new(drive.clone(), local.clone(), store.clone());
        let deletes = DeleteResolver::new(local.clone(), store.clone());
        let walker = RemoteTreeWalker::new(drive.clone(), local.clone(), store.clone());
        let executor = SyncExecutor::new(drive.clone(), local.clone(), store.clone());
        Self {
            drive,
            local,
            store,
            conflicts,
            deletes,
            walker,
            executor,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn run(
        &self,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<RunStats> {
        match &ctx.start_page_token {
            Some(cursor) => self.process_change_feed(cursor, ctx, resolver).await,
            // Shouldn't normally be reachable after initial sync, but a
            // wiped cursor must not strand remote changes
            None => self.full_walk_fallback(ctx, resolver).await,
        }
    }

    /// Downloads the remote side of the tree and refreshes the cursor
    async fn full_walk_fallback(
        &self,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<RunStats> {
        warn!("no change-feed cursor, falling back to full remote walk");
        let mut stats = RunStats::default();

        let remote_files = self.walker.walk(&ctx.drive_folder_id, resolver).await?;
        for (path, file) in remote_files {
            let remote_id = DriveId::new(file.id.clone())?;
            let stored = self.store.item_by_drive_id(&remote_id).await?;
            self.pull_file_if_needed(&path, &file, stored, false, ctx, resolver, &mut stats)
                .await?;
        }

        let cursor = self
            .drive
            .start_page_token()
            .await
            .context("fetching fresh change-feed cursor")?;
        self.store.set_start_page_token(&cursor).await?;
        Ok(stats)
    }

    /// Fetches and applies change pages starting at the stored cursor
    async fn process_change_feed(
        &self,
        cursor: &PageToken,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut token = cursor.as_str().to_string();
        let mut next_cursor: Option<PageToken> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .drive
                .list_changes(&token)
                .await
                .with_context(|| format!("listing changes at cursor {token}"))?;
            pages += 1;

            for entry in page.changes {
                let file_id = DriveId::new(entry.file_id.clone())?;
                let file = match entry.file {
                    Some(file) => Some(file),
                    None if entry.removed => None,
                    None => self.drive.file_metadata(&file_id).await?,
                };
                self.apply_change(&file_id, file, entry.removed, ctx, resolver, &mut stats)
                    .await?;
            }

            // A page without a new token must not erase one seen earlier
            if let Some(new_token) = page
                .new_start_page_token
                .filter(|t| !t.trim().is_empty())
            {
                next_cursor = Some(PageToken::new(new_token)?);
            }
            match page.next_page_token {
                Some(next) => token = next,
                None => break,
            }
        }

        if let Some(cursor) = next_cursor {
            self.store.set_start_page_token(&cursor).await?;
        }
        info!(
            pages,
            downloaded = stats.downloaded,
            deleted = stats.deleted,
            conflicts = stats.conflicts,
            "pull pass complete"
        );
        Ok(stats)
    }

    async fn apply_change(
        &self,
        file_id: &DriveId,
        file: Option<RemoteFile>,
        removed: bool,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
        stats: &mut RunStats,
    ) -> Result<()> {
        let tombstone = removed || file.as_ref().map(|f| f.trashed).unwrap_or(true);
        if tombstone {
            if ctx.prefs.ignore_remote_deletes {
                debug!(remote_id = %file_id, "remote tombstone ignored by preference");
                return Ok(());
            }
            resolver.forget_folder(file_id);
            self.deletes
                .handle_remote_deletion(file_id, Utc::now())
                .await?;
            stats.deleted += 1;
            return Ok(());
        }

        // Tombstone check above guarantees a file here
        let file = file.context("change entry without metadata")?;
        if file.app_properties.contains_key(APP_PROPERTY_MARKER) {
            return Ok(());
        }
        if file.is_folder {
            self.handle_folder_change(file_id, &file, ctx, resolver).await
        } else {
            self.handle_file_change(file_id, &file, ctx, resolver, stats)
                .await
        }
    }

    // ------------------------------------------------------------------
    // File changes
    // ------------------------------------------------------------------

    async fn handle_file_change(
        &self,
        file_id: &DriveId,
        file: &RemoteFile,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
        stats: &mut RunStats,
    ) -> Result<()> {
        let name = self.safe_local_name(file);
        if !filter::is_supported_name(&name) {
            debug!(remote_id = %file_id, name = %name, "unsupported remote file, skipping");
            return Ok(());
        }

        let mut stored = self.store.item_by_drive_id(file_id).await?;
        let Some(dir) = self
            .resolve_target_dir(file, stored.as_ref(), ctx, resolver)
            .await?
        else {
            warn!(remote_id = %file_id, name = %name, "change unresolvable, skipping");
            stats.errors += 1;
            return Ok(());
        };
        let desired = match dir.child(&name) {
            Ok(path) => path,
            Err(err) => {
                warn!(remote_id = %file_id, %err, "unusable target name, skipping");
                stats.errors += 1;
                return Ok(());
            }
        };
        if filter::is_ignored_path(&desired) {
            return Ok(());
        }

        if stored.is_none() {
            stored = self.try_adopt(file_id, file, &desired).await?;
        }

        let unique = self
            .conflicts
            .ensure_unique_local_path(&desired, Some(file_id))
            .await?;

        // A tracked file whose resolved path moved is relocated physically
        // before content is applied; the move itself must not read as a
        // concurrent local edit
        let mut suppress_local_conflict = false;
        if let Some(item) = &stored {
            if item.local_path != unique {
                let op = SyncOperation::MoveLocal {
                    from: item.local_path.clone(),
                    to: unique.clone(),
                };
                self.executor
                    .execute(vec![op], resolver, &ctx.drive_folder_id)
                    .await?;
                debug!(from = %item.local_path, to = %unique, "relocated for remote move");
                stored = self.store.item_by_path(&unique).await?;
                suppress_local_conflict = true;
            }
        }

        self.pull_file_if_needed(
            &unique,
            file,
            stored,
            suppress_local_conflict,
            ctx,
            resolver,
            stats,
        )
        .await
    }

    /// Sanitized local name, with a generated fallback for names that
    /// sanitize away entirely
    fn safe_local_name(&self, file: &RemoteFile) -> String {
        let name = self.local.sanitize_file_name(&file.name);
        if !name.is_empty() {
            return name;
        }
        let ext = file
            .name
            .rfind('.')
            .map(|idx| file.name[idx..].to_ascii_lowercase())
            .unwrap_or_default();
        format!("untitled-{}{ext}", file.id)
    }

    /// Resolution chain for the local directory a change belongs in
    ///
    /// Parent-id resolution handles true moves; a stored record keeps pure
    /// renames in place when the parent chain is unavailable; the stamped
    /// local-path property recovers identity across a remote folder rename
    /// chain. `None` means the change cannot be placed and is skipped.
    async fn resolve_target_dir(
        &self,
        file: &RemoteFile,
        stored: Option<&SyncItem>,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<Option<ResolvedDir>> {
        for parent in &file.parents {
            let parent_id = DriveId::new(parent.clone())?;
            if let Some(dir) = resolver
                .resolve_dir(&parent_id, &ctx.drive_folder_id)
                .await?
            {
                return Ok(Some(dir));
            }
        }
        if let Some(item) = stored {
            return Ok(Some(match item.local_path.parent() {
                Some(dir) => ResolvedDir::Dir(dir),
                None => ResolvedDir::Root,
            }));
        }
        if let Some(prop) = file.app_properties.get(APP_PROPERTY_LOCAL_PATH) {
            if let Ok(path) = RelPath::new(prop.clone()) {
                return Ok(Some(match path.parent() {
                    Some(dir) => ResolvedDir::Dir(dir),
                    None => ResolvedDir::Root,
                }));
            }
        }
        Ok(None)
    }

    /// First-time tracking of files that existed on both sides before a
    /// cursor existed
    async fn try_adopt(
        &self,
        file_id: &DriveId,
        file: &RemoteFile,
        desired: &RelPath,
    ) -> Result<Option<SyncItem>> {
        // An unlinked record at the same path binds as if it had always
        // been this remote file
        if let Some(mut item) = self.store.item_by_path(desired).await? {
            if item.drive_file_id.is_none() {
                item.drive_file_id = Some(file_id.clone());
                self.store.upsert_item(&item).await?;
                debug!(path = %desired, remote_id = %file_id, "adopted unlinked record");
                return Ok(Some(item));
            }
            return Ok(None);
        }

        // An untracked local file seeds a record; the older side's
        // timestamp becomes the agreement baseline so the newer side still
        // reads as changed
        let Some(meta) = self.local.file_meta(desired).await? else {
            return Ok(None);
        };
        let epoch = Utc.timestamp_millis_opt(0).unwrap();
        let remote_modified = file.modified.unwrap_or(epoch);
        let baseline = meta.modified.min(remote_modified);
        let state = if meta.modified > remote_modified {
            SyncState::PendingUpload
        } else {
            SyncState::Synced
        };
        let hash = self.local.compute_hash(desired).await?;
        let item = SyncItem {
            local_path: desired.clone(),
            local_modified: meta.modified,
            local_size: meta.size,
            local_hash: Some(hash),
            drive_file_id: Some(file_id.clone()),
            drive_modified: file.modified,
            last_synced_at: Some(baseline),
            state,
            last_error: None,
        };
        self.store.upsert_item(&item).await?;
        debug!(path = %desired, remote_id = %file_id, state = %item.state, "adopted untracked local file");
        Ok(Some(item))
    }

    /// Applies remote content to the local path when the remote side
    /// actually changed since last agreement
    #[allow(clippy::too_many_arguments)]
    async fn pull_file_if_needed(
        &self,
        path: &RelPath,
        file: &RemoteFile,
        stored: Option<SyncItem>,
        suppress_local_conflict: bool,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
        stats: &mut RunStats,
    ) -> Result<()> {
        let epoch = Utc.timestamp_millis_opt(0).unwrap();
        let mark = stored
            .as_ref()
            .and_then(|i| i.last_synced_at)
            .unwrap_or(epoch);
        let local_meta = self.local.file_meta(path).await?;
        let local_changed = local_meta
            .as_ref()
            .map(|m| m.modified > mark)
            .unwrap_or(false);
        let remote_modified = file.modified.unwrap_or(epoch);
        let remote_changed = remote_modified > mark;

        if local_changed && remote_changed && !suppress_local_conflict {
            if self
                .conflicts
                .create_conflict_copy_from_remote(path, file, Utc::now())
                .await?
                .is_some()
            {
                stats.conflicts += 1;
            }
            // Local stays canonical; the divergence is consumed here so
            // push re-uploads without raising the same conflict again
            if let Some(mut item) = stored {
                item.state = SyncState::PendingUpload;
                item.drive_modified = file.modified;
                item.last_synced_at = Some(Utc::now());
                self.store.upsert_item(&item).await?;
            }
            return Ok(());
        }

        if !remote_changed {
            debug!(path = %path, "remote unchanged since last sync");
            return Ok(());
        }

        let op = SyncOperation::Download {
            path: path.clone(),
            file: file.clone(),
        };
        self.executor
            .execute(vec![op], resolver, &ctx.drive_folder_id)
            .await?;
        stats.downloaded += 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Folder changes
    // ------------------------------------------------------------------

    async fn handle_folder_change(
        &self,
        folder_id: &DriveId,
        file: &RemoteFile,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<()> {
        if folder_id == &ctx.drive_folder_id {
            return Ok(());
        }
        let name = self.local.sanitize_file_name(&file.name);
        if name.is_empty() {
            warn!(remote_id = %folder_id, "folder name sanitizes to empty, skipping");
            return Ok(());
        }
        let Some(dir) = self
            .resolve_parent_dir(file, ctx, resolver)
            .await?
        else {
            warn!(remote_id = %folder_id, name = %name, "folder change unresolvable, skipping");
            return Ok(());
        };
        let new_path = match dir.child(&name) {
            Ok(path) => path,
            Err(err) => {
                warn!(remote_id = %folder_id, %err, "unusable folder name, skipping");
                return Ok(());
            }
        };
        if filter::is_ignored_path(&new_path) {
            return Ok(());
        }

        match self.store.folder_by_drive_id(folder_id).await? {
            None => {
                self.local.ensure_dir(&new_path).await?;
                self.store
                    .upsert_folder(&SyncFolder::new(new_path.clone(), folder_id.clone()))
                    .await?;
                resolver.record_folder(&new_path, folder_id);
                debug!(path = %new_path, "created local folder for remote folder");
            }
            Some(existing) if existing.local_path == new_path => {
                self.local.ensure_dir(&new_path).await?;
            }
            Some(existing) => {
                self.relocate_folder(&existing.local_path, &new_path, ctx, resolver)
                    .await?;
            }
        }
        Ok(())
    }

    async fn resolve_parent_dir(
        &self,
        file: &RemoteFile,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<Option<ResolvedDir>> {
        for parent in &file.parents {
            let parent_id = DriveId::new(parent.clone())?;
            if let Some(dir) = resolver
                .resolve_dir(&parent_id, &ctx.drive_folder_id)
                .await?
            {
                return Ok(Some(dir));
            }
        }
        Ok(None)
    }

    /// Applies a remote folder move/rename to every tracked path under it
    ///
    /// Files move one by one; there is no atomic directory rename in the
    /// local gateway contract.
    async fn relocate_folder(
        &self,
        old: &RelPath,
        new: &RelPath,
        ctx: &SyncContext,
        resolver: &mut FolderPathResolver,
    ) -> Result<()> {
        info!(from = %old, to = %new, "remote folder moved, relocating local tree");
        self.local.ensure_dir(new).await?;

        let mut moves: Vec<SyncOperation> = Vec::new();
        for item in self.store.items_with_path_prefix(old).await? {
            let Some(target) = item.local_path.replace_prefix(old, new) else {
                continue;
            };
            moves.push(SyncOperation::MoveLocal {
                from: item.local_path,
                to: target,
            });
        }
        self.executor
            .execute(moves, resolver, &ctx.drive_folder_id)
            .await?;

        for folder in self.store.folders_with_path_prefix(old).await? {
            let Some(target) = folder.local_path.replace_prefix(old, new) else {
                continue;
            };
            self.store.delete_folder(&folder.local_path).await?;
            resolver.forget_folder(&folder.drive_folder_id);
            self.store
                .upsert_folder(&SyncFolder::new(target.clone(), folder.drive_folder_id.clone()))
                .await?;
            resolver.record_folder(&target, &folder.drive_folder_id);
        }

        self.local.delete_dir_if_empty(old).await?;
        Ok(())
    }
}
