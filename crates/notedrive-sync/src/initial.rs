//! Initial full-tree reconciliation
//!
//! Runs exactly once per remote-folder linkage, while no change-feed
//! cursor exists: walk the whole remote tree, diff it against the local
//! tree, and transfer whichever side is newer. The tie-break is `>=` in
//! favor of local so a freshly created local note whose clock matches
//! remote within the same second is never silently discarded.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use tracing::{debug, info};

use notedrive_core::ports::{DriveGateway, LocalFsGateway, SyncStore};

use crate::engine::RunStats;
use crate::executor::{SyncExecutor, SyncOperation};
use crate::filter;
use crate::path_resolver::FolderPathResolver;
use crate::preflight::SyncContext;
use crate::tree_walker::RemoteTreeWalker;

/// Full-tree reconciliation for the first run after linking
pub struct InitialSyncUseCase {
    drive: Arc<dyn DriveGateway>,
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
    walker: RemoteTreeWalker,
    executor: SyncExecutor,
}

impl InitialSyncUseCase {
    pub fn new(
        drive: Arc<dyn DriveGateway>,
        local: Arc<dyn LocalFsGateway>,
        store: Arc<dyn SyncStore>,
    ) -> Self {
        let walker = RemoteTreeWalker::new(drive.clone(), local.clone(), store.clone());
        let executor = SyncExecutor::new(drive.clone(), local.clone(), store.clone());
        Self {
            drive,
            local,
            store,
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
        let root_id = &ctx.drive_folder_id;
        let mut remote_files = self.walker.walk(root_id, resolver).await?;

        let local_files: Vec<_> = self
            .local
            .list_files()
            .await
            .context("listing local tree")?
            .into_iter()
            .filter(|m| filter::is_supported_path(&m.path) && !filter::is_ignored_path(&m.path))
            .collect();
        debug!(
            local = local_files.len(),
            remote = remote_files.len(),
            "initial sync snapshots"
        );

        let epoch = Utc.timestamp_millis_opt(0).unwrap();
        let mut ops: Vec<SyncOperation> = Vec::new();
        let mut stats = RunStats::default();

        for meta in local_files {
            match remote_files.remove(&meta.path) {
                None => {
                    stats.uploaded += 1;
                    ops.push(SyncOperation::Upload {
                        path: meta.path.clone(),
                        meta,
                        hash: None,
                        known_remote: None,
                    });
                }
                Some(remote) => {
                    // Local-newer-or-equal wins and overwrites the remote
                    // content at the existing id
                    if meta.modified >= remote.modified.unwrap_or(epoch) {
                        stats.uploaded += 1;
                        ops.push(SyncOperation::Upload {
                            path: meta.path.clone(),
                            meta,
                            hash: None,
                            known_remote: Some(remote),
                        });
                    } else {
                        stats.downloaded += 1;
                        ops.push(SyncOperation::Download {
                            path: meta.path.clone(),
                            file: remote,
                        });
                    }
                }
            }
        }
        for (path, remote) in remote_files {
            stats.downloaded += 1;
            ops.push(SyncOperation::Download { path, file: remote });
        }

        self.executor.execute(ops, resolver, root_id).await?;

        let cursor = self
            .drive
            .start_page_token()
            .await
            .context("fetching initial change-feed cursor")?;
        self.store.set_start_page_token(&cursor).await?;
        self.store.set_last_full_scan_at(Utc::now()).await?;

        info!(
            uploaded = stats.uploaded,
            downloaded = stats.downloaded,
            "initial sync complete"
        );
        Ok(stats)
    }
}
