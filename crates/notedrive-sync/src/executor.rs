//! Primitive sync operations
//!
//! Use cases decide *what* should happen and queue [`SyncOperation`]s; the
//! executor owns *how*: gateway call order, bookkeeping updates, and the
//! per-file error stamp. Operations run strictly sequentially. A gateway
//! failure stamps the item record with `last_error` and then propagates,
//! aborting the run so the runner can classify it.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use notedrive_core::domain::{DriveId, RelPath, RemoteDeletePolicy, SyncItem, SyncState};
use notedrive_core::ports::{
    DriveGateway, LocalFileMeta, LocalFsGateway, RemoteFile, SyncStore, UploadRequest,
};

use crate::filter;
use crate::path_resolver::FolderPathResolver;

/// One primitive reconciliation step
#[derive(Debug, Clone)]
pub enum SyncOperation {
    /// Write the remote content over the local path
    Download { path: RelPath, file: RemoteFile },
    /// Send the local content to the remote side (create or update)
    Upload {
        path: RelPath,
        meta: LocalFileMeta,
        /// Pre-computed content digest, when the caller already has one
        hash: Option<String>,
        /// Remote counterpart, when the caller already identified it
        known_remote: Option<RemoteFile>,
    },
    /// Propagate a local deletion to the remote side
    DeleteRemote {
        path: RelPath,
        file_id: DriveId,
        policy: RemoteDeletePolicy,
    },
    /// Rename/move a local file and rekey its record
    MoveLocal { from: RelPath, to: RelPath },
}

impl SyncOperation {
    /// Correlation key for result reporting
    pub fn key(&self) -> String {
        match self {
            SyncOperation::Download { path, .. } => format!("download:{path}"),
            SyncOperation::Upload { path, .. } => format!("upload:{path}"),
            SyncOperation::DeleteRemote { path, .. } => format!("delete:{path}"),
            SyncOperation::MoveLocal { from, to } => format!("move:{from}->{to}"),
        }
    }

    /// Path of the record this operation concerns
    fn record_path(&self) -> &RelPath {
        match self {
            SyncOperation::Download { path, .. } => path,
            SyncOperation::Upload { path, .. } => path,
            SyncOperation::DeleteRemote { path, .. } => path,
            SyncOperation::MoveLocal { from, .. } => from,
        }
    }
}

/// Logical outcome of one executed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpResult {
    Done,
    /// Nothing needed doing (policy opt-out, remote file already gone)
    Skipped,
}

/// Sequential executor for queued operations
pub struct SyncExecutor {
    drive: Arc<dyn DriveGateway>,
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
}

impl SyncExecutor {
    pub fn new(
        drive: Arc<dyn DriveGateway>,
        local: Arc<dyn LocalFsGateway>,
        store: Arc<dyn SyncStore>,
    ) -> Self {
        Self {
            drive,
            local,
            store,
        }
    }

    /// Executes the batch in order, returning one keyed result per op
    pub async fn execute(
        &self,
        ops: Vec<SyncOperation>,
        resolver: &mut FolderPathResolver,
        root_id: &DriveId,
    ) -> Result<Vec<(String, OpResult)>> {
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let key = op.key();
            let path = op.record_path().clone();
            match self.execute_one(op, resolver, root_id).await {
                Ok(result) => results.push((key, result)),
                Err(err) => {
                    self.stamp_error(&path, &err).await;
                    return Err(err.context(format!("executing {key}")));
                }
            }
        }
        Ok(results)
    }

    async fn execute_one(
        &self,
        op: SyncOperation,
        resolver: &mut FolderPathResolver,
        root_id: &DriveId,
    ) -> Result<OpResult> {
        match op {
            SyncOperation::Download { path, file } => self.download(path, file).await,
            SyncOperation::Upload {
                path,
                meta,
                hash,
                known_remote,
            } => self.upload(path, meta, hash, known_remote, resolver, root_id).await,
            SyncOperation::DeleteRemote {
                path,
                file_id,
                policy,
            } => self.delete_remote(path, file_id, policy).await,
            SyncOperation::MoveLocal { from, to } => self.move_local(from, to).await,
        }
    }

    async fn download(&self, path: RelPath, file: RemoteFile) -> Result<OpResult> {
        let remote_id = DriveId::new(file.id.clone())?;
        let data = self
            .drive
            .download_file(&remote_id)
            .await
            .with_context(|| format!("downloading {path}"))?;
        self.local
            .write_file(&path, &data)
            .await
            .with_context(|| format!("writing {path}"))?;

        let meta = self
            .local
            .file_meta(&path)
            .await?
            .with_context(|| format!("file vanished after write: {path}"))?;
        let hash = self.local.compute_hash(&path).await?;
        self.store
            .upsert_item(&SyncItem::synced(
                path.clone(),
                meta.modified,
                meta.size,
                Some(hash),
                remote_id,
                file.modified,
                Utc::now(),
            ))
            .await?;
        info!(path = %path, size = meta.size, "downloaded");
        Ok(OpResult::Done)
    }

    async fn upload(
        &self,
        path: RelPath,
        meta: LocalFileMeta,
        hash: Option<String>,
        known_remote: Option<RemoteFile>,
        resolver: &mut FolderPathResolver,
        root_id: &DriveId,
    ) -> Result<OpResult> {
        let hash = match hash {
            Some(hash) => hash,
            None => self.local.compute_hash(&path).await?,
        };
        let parent_id = resolver
            .ensure_remote_folder_chain(path.parent().as_ref(), root_id)
            .await
            .with_context(|| format!("resolving remote folder for {path}"))?;
        let file_id = match known_remote {
            Some(remote) => Some(DriveId::new(remote.id)?),
            None => match self
                .store
                .item_by_path(&path)
                .await?
                .and_then(|item| item.drive_file_id)
            {
                Some(id) => Some(id),
                // A remote note can predate local tracking; update it in
                // place instead of creating a same-named sibling
                None => self
                    .drive
                    .find_child_by_name(&parent_id, path.file_name())
                    .await
                    .with_context(|| format!("looking up remote name for {path}"))?
                    .filter(|f| !f.is_folder && !f.trashed)
                    .map(|f| DriveId::new(f.id))
                    .transpose()?,
            },
        };

        let content = self
            .local
            .read_file(&path)
            .await
            .with_context(|| format!("reading {path}"))?;
        let request = UploadRequest::for_note(
            file_id,
            parent_id,
            path.file_name().to_string(),
            filter::mime_type_for(&path).to_string(),
            content,
            &path,
        );
        let uploaded = self
            .drive
            .create_or_update_file(request)
            .await
            .with_context(|| format!("uploading {path}"))?;

        self.store
            .upsert_item(&SyncItem::synced(
                path.clone(),
                meta.modified,
                meta.size,
                Some(hash),
                DriveId::new(uploaded.id)?,
                uploaded.modified,
                Utc::now(),
            ))
            .await?;
        info!(path = %path, size = meta.size, "uploaded");
        Ok(OpResult::Done)
    }

    async fn delete_remote(
        &self,
        path: RelPath,
        file_id: DriveId,
        policy: RemoteDeletePolicy,
    ) -> Result<OpResult> {
        match policy {
            RemoteDeletePolicy::Trash => {
                self.drive
                    .trash_file(&file_id)
                    .await
                    .with_context(|| format!("trashing remote file for {path}"))?;
                info!(path = %path, remote_id = %file_id, "trashed remote file");
                Ok(OpResult::Done)
            }
            RemoteDeletePolicy::Delete => {
                self.drive
                    .delete_file(&file_id)
                    .await
                    .with_context(|| format!("deleting remote file for {path}"))?;
                info!(path = %path, remote_id = %file_id, "deleted remote file");
                Ok(OpResult::Done)
            }
            RemoteDeletePolicy::Ignore => {
                debug!(path = %path, "remote delete skipped (policy: ignore)");
                Ok(OpResult::Skipped)
            }
        }
    }

    /// Moves the file and rekeys its record; a record whose file is
    /// already gone locally is rekeyed without a physical move
    async fn move_local(&self, from: RelPath, to: RelPath) -> Result<OpResult> {
        let moved = self.local.exists(&from).await?;
        if moved {
            self.local
                .move_file(&from, &to)
                .await
                .with_context(|| format!("moving {from} to {to}"))?;
        }
        if let Some(mut item) = self.store.item_by_path(&from).await? {
            self.store.delete_item(&from).await?;
            item.local_path = to.clone();
            self.store.upsert_item(&item).await?;
        }
        if moved {
            info!(from = %from, to = %to, "moved local file");
            Ok(OpResult::Done)
        } else {
            Ok(OpResult::Skipped)
        }
    }

    /// Best-effort `last_error` stamp before an error aborts the run
    async fn stamp_error(&self, path: &RelPath, err: &anyhow::Error) {
        let Ok(Some(mut item)) = self.store.item_by_path(path).await else {
            return;
        };
        item.state = SyncState::Error;
        item.last_error = Some(format!("{err:#}"));
        let _ = self.store.upsert_item(&item).await;
    }
}
