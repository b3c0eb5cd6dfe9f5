//! Remote-folder to local-path resolution
//!
//! Maps between remote folder ids and local directories in both directions,
//! with run-scoped caches on top of the persistent `SyncFolder` mappings.
//! Caches are plain maps because a run is strictly sequential; the engine
//! builds a fresh resolver per run so nothing stale survives.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use notedrive_core::domain::{DomainError, DriveId, RelPath, SyncFolder};
use notedrive_core::ports::{DriveGateway, LocalFsGateway, SyncStore};

/// Local directory a remote folder maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDir {
    /// The sync root itself
    Root,
    /// A tracked subdirectory
    Dir(RelPath),
}

impl ResolvedDir {
    /// The directory as an optional path (`None` for the root)
    pub fn as_parent(&self) -> Option<&RelPath> {
        match self {
            ResolvedDir::Root => None,
            ResolvedDir::Dir(path) => Some(path),
        }
    }

    /// Path of a child with the given name inside this directory
    pub fn child(&self, name: &str) -> Result<RelPath, DomainError> {
        RelPath::under(self.as_parent(), name)
    }
}

/// Bidirectional folder/path resolver with run-scoped caches
pub struct FolderPathResolver {
    drive: Arc<dyn DriveGateway>,
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
    /// Remote folder id -> resolved local dir (`None` caches "unresolvable")
    dir_by_id: HashMap<String, Option<ResolvedDir>>,
    /// Local dir path -> remote folder id
    id_by_dir: HashMap<String, DriveId>,
}

impl FolderPathResolver {
    pub fn new(
        drive: Arc<dyn DriveGateway>,
        local: Arc<dyn LocalFsGateway>,
        store: Arc<dyn SyncStore>,
    ) -> Self {
        Self {
            drive,
            local,
            store,
            dir_by_id: HashMap::new(),
            id_by_dir: HashMap::new(),
        }
    }

    /// Drops both caches; persistent mappings are untouched
    pub fn reset(&mut self) {
        self.dir_by_id.clear();
        self.id_by_dir.clear();
    }

    /// Seeds both caches with a known folder mapping
    pub fn record_folder(&mut self, path: &RelPath, id: &DriveId) {
        self.dir_by_id.insert(
            id.as_str().to_string(),
            Some(ResolvedDir::Dir(path.clone())),
        );
        self.id_by_dir.insert(path.as_str().to_string(), id.clone());
    }

    /// Drops any cached mapping for the given folder id
    pub fn forget_folder(&mut self, id: &DriveId) {
        if let Some(Some(ResolvedDir::Dir(path))) = self.dir_by_id.remove(id.as_str()) {
            self.id_by_dir.remove(path.as_str());
        }
    }

    /// Resolves a remote folder id to its local directory
    ///
    /// Resolution order: sync root check, run cache, persistent mapping,
    /// then an upward walk of the remote parent chain. Returns `None` when
    /// the folder is trashed, outside the sync root, has an unusable name,
    /// or its parent chain loops (defense against pathological metadata).
    pub async fn resolve_dir(
        &mut self,
        folder_id: &DriveId,
        root_id: &DriveId,
    ) -> Result<Option<ResolvedDir>> {
        if folder_id == root_id {
            return Ok(Some(ResolvedDir::Root));
        }
        if let Some(cached) = self.dir_by_id.get(folder_id.as_str()) {
            return Ok(cached.clone());
        }
        if let Some(folder) = self.store.folder_by_drive_id(folder_id).await? {
            let dir = ResolvedDir::Dir(folder.local_path.clone());
            self.record_folder(&folder.local_path, folder_id);
            return Ok(Some(dir));
        }

        let resolved = self.walk_parent_chain(folder_id, root_id).await?;
        self.dir_by_id
            .insert(folder_id.as_str().to_string(), resolved.clone());
        if let Some(ResolvedDir::Dir(path)) = &resolved {
            self.id_by_dir
                .insert(path.as_str().to_string(), folder_id.clone());
        }
        Ok(resolved)
    }

    /// Walks remote parents upward until the root or a known folder
    async fn walk_parent_chain(
        &mut self,
        folder_id: &DriveId,
        root_id: &DriveId,
    ) -> Result<Option<ResolvedDir>> {
        let mut segments: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = folder_id.clone();

        loop {
            if !visited.insert(current.as_str().to_string()) {
                warn!(folder_id = %folder_id, "parent chain loops, skipping folder");
                return Ok(None);
            }
            let meta = match self
                .drive
                .file_metadata(&current)
                .await
                .with_context(|| format!("fetching folder metadata for {current}"))?
            {
                Some(meta) => meta,
                None => return Ok(None),
            };
            if meta.trashed || !meta.is_folder {
                return Ok(None);
            }
            let name = self.local.sanitize_file_name(&meta.name);
            if name.is_empty() {
                return Ok(None);
            }
            segments.push(name);

            let parent = match meta.primary_parent() {
                Some(parent) => parent.to_string(),
                None => return Ok(None),
            };
            if parent == root_id.as_str() {
                return Ok(Some(Self::assemble(None, &segments)?));
            }
            if let Some(Some(dir)) = self.dir_by_id.get(&parent) {
                return Ok(Some(Self::assemble(dir.as_parent().cloned(), &segments)?));
            }
            let parent_id = DriveId::new(parent.clone())?;
            if let Some(folder) = self.store.folder_by_drive_id(&parent_id).await? {
                return Ok(Some(Self::assemble(Some(folder.local_path), &segments)?));
            }
            current = parent_id;
        }
    }

    /// Joins bottom-up collected segments onto a known prefix
    fn assemble(prefix: Option<RelPath>, segments: &[String]) -> Result<ResolvedDir> {
        let mut dir = prefix;
        for name in segments.iter().rev() {
            dir = Some(RelPath::under(dir.as_ref(), name)?);
        }
        // segments is never empty here
        let path = dir.context("empty folder path")?;
        Ok(ResolvedDir::Dir(path))
    }

    /// Resolves (creating as needed) the remote folder backing a local
    /// directory, returning the root id for a `None` parent
    ///
    /// Existing remote folders are reused by exact name match; missing
    /// ones are created level by level. Every mapping touched is persisted
    /// so later runs skip the remote lookups.
    pub async fn ensure_remote_folder_chain(
        &mut self,
        dir: Option<&RelPath>,
        root_id: &DriveId,
    ) -> Result<DriveId> {
        let dir = match dir {
            Some(dir) => dir,
            None => return Ok(root_id.clone()),
        };

        let mut parent = root_id.clone();
        let mut prefix: Option<RelPath> = None;
        for segment in dir.as_str().split('/') {
            let level = RelPath::under(prefix.as_ref(), segment)?;

            if let Some(id) = self.id_by_dir.get(level.as_str()) {
                parent = id.clone();
                prefix = Some(level);
                continue;
            }
            if let Some(folder) = self.store.folder_by_path(&level).await? {
                self.record_folder(&level, &folder.drive_folder_id);
                parent = folder.drive_folder_id;
                prefix = Some(level);
                continue;
            }

            let existing = self
                .drive
                .find_child_by_name(&parent, segment)
                .await
                .with_context(|| format!("looking up remote folder '{level}'"))?;
            let id = match existing.filter(|f| f.is_folder) {
                Some(folder) => DriveId::new(folder.id)?,
                None => {
                    let created = self
                        .drive
                        .create_folder(&parent, segment)
                        .await
                        .with_context(|| format!("creating remote folder '{level}'"))?;
                    DriveId::new(created.id)?
                }
            };

            self.store
                .upsert_folder(&SyncFolder::new(level.clone(), id.clone()))
                .await?;
            self.record_folder(&level, &id);
            parent = id;
            prefix = Some(level);
        }
        Ok(parent)
    }
}
