//! Conflict copies and name collision handling
//!
//! When both replicas changed the same note since the last agreement, the
//! engine keeps both versions: the losing side is materialized as a sibling
//! "conflict copy" that deliberately carries no remote link, so the user
//! merges by hand and the copy uploads as a new note on the next push.
//!
//! Conflict-copy creation is best effort: a failure to write the copy is
//! logged and swallowed rather than aborting the surrounding pass.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use notedrive_core::domain::{DriveId, RelPath, SyncItem, SyncState};
use notedrive_core::ports::{
    DriveGateway, LocalFsGateway, RemoteFile, StorageUnavailable, SyncStore,
};

/// Numbered-suffix probes before falling back to a UUID suffix
pub const MAX_DUPLICATE_NAME_ATTEMPTS: u32 = 200;

/// Splits a file name into (stem, extension-with-dot)
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.').filter(|&idx| idx > 0) {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

/// Builds a timestamped sibling name, e.g. `todo (conflict 2026-08-27 14-03).md`
pub fn timestamped_name(name: &str, label: &str, at: DateTime<Utc>) -> String {
    let (stem, ext) = split_name(name);
    format!("{stem} ({label} {}){ext}", at.format("%Y-%m-%d %H-%M"))
}

/// Conflict-copy materialization and unique-name probing
pub struct ConflictResolver {
    drive: Arc<dyn DriveGateway>,
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
}

impl ConflictResolver {
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

    /// Returns true if the path is claimed by something other than the
    /// given remote file
    async fn is_taken(&self, path: &RelPath, drive_id: Option<&DriveId>) -> Result<bool> {
        if let Some(item) = self.store.item_by_path(path).await? {
            return Ok(item.drive_file_id.as_ref() != drive_id || drive_id.is_none());
        }
        // Untracked local files also claim their name
        self.local.exists(path).await
    }

    /// Finds a free local path at or near the desired one
    ///
    /// The desired path itself is kept when it is unclaimed, or claimed by
    /// the same remote file (an overwrite, not a collision). Otherwise
    /// numbered ` (n)` suffixes are probed up to
    /// [`MAX_DUPLICATE_NAME_ATTEMPTS`], then a UUID suffix guarantees
    /// termination.
    pub async fn ensure_unique_local_path(
        &self,
        desired: &RelPath,
        drive_id: Option<&DriveId>,
    ) -> Result<RelPath> {
        if !self.is_taken(desired, drive_id).await? {
            return Ok(desired.clone());
        }

        let dir = desired.parent();
        let (stem, ext) = split_name(desired.file_name());

        for attempt in 1..=MAX_DUPLICATE_NAME_ATTEMPTS {
            let candidate = RelPath::under(dir.as_ref(), &format!("{stem} ({attempt}){ext}"))?;
            if !self.is_taken(&candidate, drive_id).await? {
                return Ok(candidate);
            }
        }

        loop {
            let candidate =
                RelPath::under(dir.as_ref(), &format!("{stem} ({}){ext}", Uuid::new_v4()))?;
            if !self.is_taken(&candidate, drive_id).await? {
                warn!(path = %desired, "name probing exhausted, using uuid suffix");
                return Ok(candidate);
            }
        }
    }

    /// Writes the remote version of a conflicted note as a local sibling
    ///
    /// The copy gets a `Conflict` record with no remote link; push treats
    /// it as a brand-new note. Returns the copy's path, or `None` when the
    /// local write failed (the conflict is then effectively resolved in
    /// favor of whichever side overwrites next).
    pub async fn create_conflict_copy_from_remote(
        &self,
        original: &RelPath,
        remote: &RemoteFile,
        now: DateTime<Utc>,
    ) -> Result<Option<RelPath>> {
        let remote_id = DriveId::new(remote.id.clone())?;
        let name = timestamped_name(original.file_name(), "conflict", now);
        let desired = RelPath::under(original.parent().as_ref(), &name)?;
        let path = self.ensure_unique_local_path(&desired, None).await?;

        let data = self
            .drive
            .download_file(&remote_id)
            .await
            .with_context(|| format!("downloading remote version of {original}"))?;

        if let Err(err) = self.local.write_file(&path, &data).await {
            if err.chain().any(|c| c.is::<StorageUnavailable>()) {
                return Err(err);
            }
            warn!(path = %path, error = %err, "failed to write conflict copy");
            return Ok(None);
        }

        let meta = self
            .local
            .file_meta(&path)
            .await?
            .with_context(|| format!("conflict copy vanished after write: {path}"))?;
        let hash = self.local.compute_hash(&path).await?;
        self.store
            .upsert_item(&SyncItem {
                local_path: path.clone(),
                local_modified: meta.modified,
                local_size: meta.size,
                local_hash: Some(hash),
                drive_file_id: None,
                drive_modified: None,
                last_synced_at: None,
                state: SyncState::Conflict,
                last_error: None,
            })
            .await?;

        info!(original = %original, copy = %path, "created conflict copy from remote");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("todo.md"), ("todo", ".md"));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_name("Makefile"), ("Makefile", ""));
        assert_eq!(split_name(".trash"), (".trash", ""));
    }

    #[test]
    fn test_timestamped_name() {
        let at = Utc.with_ymd_and_hms(2026, 8, 27, 14, 3, 59).unwrap();
        assert_eq!(
            timestamped_name("todo.md", "conflict", at),
            "todo (conflict 2026-08-27 14-03).md"
        );
        assert_eq!(
            timestamped_name("notes", "deleted", at),
            "notes (deleted 2026-08-27 14-03)"
        );
    }
}
