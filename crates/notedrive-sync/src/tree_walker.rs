//! Remote tree walk
//!
//! Breadth-first traversal of the linked remote folder, producing a
//! path-keyed snapshot of every syncable remote note and persisting a
//! `SyncFolder` mapping for every directory seen. Initial sync diffs this
//! snapshot against the local listing; pull uses it as the defensive
//! fallback when no change-feed cursor exists.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use notedrive_core::domain::{DriveId, RelPath, SyncFolder};
use notedrive_core::ports::{
    DriveGateway, LocalFsGateway, RemoteFile, SyncStore, APP_PROPERTY_MARKER,
};

use crate::filter;
use crate::path_resolver::FolderPathResolver;

/// Breadth-first remote tree walker
pub struct RemoteTreeWalker {
    drive: Arc<dyn DriveGateway>,
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
}

impl RemoteTreeWalker {
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

    /// Walks the remote tree under the sync root
    ///
    /// Returns the syncable remote files keyed by their prospective local
    /// path. When two remote siblings map to the same local path (the drive
    /// allows duplicate names), the most recently modified one wins.
    pub async fn walk(
        &self,
        root_id: &DriveId,
        resolver: &mut FolderPathResolver,
    ) -> Result<HashMap<RelPath, RemoteFile>> {
        let mut files: HashMap<RelPath, RemoteFile> = HashMap::new();
        let mut queue: Vec<(Option<RelPath>, DriveId)> = vec![(None, root_id.clone())];
        let mut cursor = 0usize;

        while cursor < queue.len() {
            let (dir, folder_id) = queue[cursor].clone();
            cursor += 1;

            let mut page_token: Option<String> = None;
            loop {
                let page = self
                    .drive
                    .list_children(&folder_id, page_token.as_deref())
                    .await
                    .with_context(|| format!("listing remote folder {folder_id}"))?;

                for child in page.files {
                    if child.trashed {
                        continue;
                    }
                    let name = self.local.sanitize_file_name(&child.name);
                    if name.is_empty() {
                        warn!(remote_id = %child.id, "remote name sanitizes to empty, skipping");
                        continue;
                    }
                    let path = match RelPath::under(dir.as_ref(), &name) {
                        Ok(path) => path,
                        Err(err) => {
                            warn!(remote_id = %child.id, %err, "unusable remote name, skipping");
                            continue;
                        }
                    };
                    if filter::is_ignored_path(&path) {
                        continue;
                    }

                    if child.is_folder {
                        let id = DriveId::new(child.id.clone())?;
                        self.store
                            .upsert_folder(&SyncFolder::new(path.clone(), id.clone()))
                            .await?;
                        resolver.record_folder(&path, &id);
                        queue.push((Some(path), id));
                        continue;
                    }

                    if child.app_properties.contains_key(APP_PROPERTY_MARKER) {
                        continue;
                    }
                    if !filter::is_supported_path(&path) {
                        continue;
                    }
                    match files.get(&path) {
                        Some(existing) if existing.modified >= child.modified => {
                            debug!(path = %path, "duplicate remote name, keeping newer sibling");
                        }
                        _ => {
                            files.insert(path, child);
                        }
                    }
                }

                match page.next_page_token {
                    Some(next) => page_token = Some(next),
                    None => break,
                }
            }
        }

        debug!(count = files.len(), "remote tree walk complete");
        Ok(files)
    }
}
