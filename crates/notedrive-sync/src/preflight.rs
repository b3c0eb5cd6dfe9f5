//! Run preflight
//!
//! Validates configuration, resolves authorization, and pins down the
//! remote root folder before any reconciliation work starts. Every step is
//! an early exit: the outcome is either a ready-to-run [`SyncContext`] or
//! a terminal [`SyncOutcome`] the engine returns verbatim.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use notedrive_core::domain::{DriveId, PageToken, SyncOutcome, SyncPreferences, SyncStatusState};
use notedrive_core::ports::{AuthGateway, DriveGateway, PrefsGateway, RemoteFile, SyncStore};

/// Everything a run needs once preflight has passed
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Access token minted for this run
    pub access_token: String,
    /// Preference snapshot taken at run start
    pub prefs: SyncPreferences,
    /// Remote root folder all notes sync under
    pub drive_folder_id: DriveId,
    /// Stored change-feed cursor; `None` selects initial sync
    pub start_page_token: Option<PageToken>,
}

/// Result of preflight: proceed, or stop with a terminal outcome
#[derive(Debug, Clone)]
pub enum PreflightOutcome {
    Ready(SyncContext),
    Done(SyncOutcome),
}

/// Result of resolving the remote root folder
#[derive(Debug, Clone, PartialEq, Eq)]
enum EnsureDriveFolderResult {
    Ok { id: DriveId, name: String },
    Error(String),
}

/// Preference, auth, and remote-root checks before a run
pub struct SyncPreflight {
    prefs: Arc<dyn PrefsGateway>,
    auth: Arc<dyn AuthGateway>,
    drive: Arc<dyn DriveGateway>,
    store: Arc<dyn SyncStore>,
}

impl SyncPreflight {
    pub fn new(
        prefs: Arc<dyn PrefsGateway>,
        auth: Arc<dyn AuthGateway>,
        drive: Arc<dyn DriveGateway>,
        store: Arc<dyn SyncStore>,
    ) -> Self {
        Self {
            prefs,
            auth,
            drive,
            store,
        }
    }

    /// Runs all preflight steps in order
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<PreflightOutcome> {
        let prefs = self.prefs.preferences().await.context("loading preferences")?;

        if !prefs.enabled {
            self.store
                .set_status(SyncStatusState::Idle, None, None)
                .await?;
            return Ok(PreflightOutcome::Done(SyncOutcome::Skipped));
        }
        if prefs.paused {
            self.store
                .set_status(SyncStatusState::Pending, Some("Sync paused".to_string()), None)
                .await?;
            return Ok(PreflightOutcome::Done(SyncOutcome::Skipped));
        }
        if prefs.local_root.is_none() {
            self.store
                .set_status(
                    SyncStatusState::Error,
                    Some("No local folder selected".to_string()),
                    None,
                )
                .await?;
            return Ok(PreflightOutcome::Done(SyncOutcome::Failure { auth_error: false }));
        }

        let access_token = match self.auth.access_token().await.context("acquiring token")? {
            Some(token) => token,
            None => {
                self.store
                    .set_status(
                        SyncStatusState::Error,
                        Some("Sign in required".to_string()),
                        None,
                    )
                    .await?;
                return Ok(PreflightOutcome::Done(SyncOutcome::Failure { auth_error: true }));
            }
        };

        self.store
            .set_status(SyncStatusState::Running, Some("Syncing...".to_string()), None)
            .await?;

        let (id, _name) = match self.ensure_drive_folder(&prefs).await? {
            EnsureDriveFolderResult::Ok { id, name } => (id, name),
            EnsureDriveFolderResult::Error(message) => {
                self.store
                    .set_status(SyncStatusState::Error, Some(message), None)
                    .await?;
                return Ok(PreflightOutcome::Done(SyncOutcome::Failure { auth_error: false }));
            }
        };

        let meta = self.store.meta().await?;
        Ok(PreflightOutcome::Ready(SyncContext {
            access_token,
            prefs,
            drive_folder_id: id,
            start_page_token: meta.start_page_token,
        }))
    }

    /// Resolves the remote root folder identity
    ///
    /// A stored id is trusted as-is. Otherwise marker files identify
    /// candidate folders even after a rename; the configured display name
    /// is the last resort and gets a marker stamped on adoption.
    async fn ensure_drive_folder(
        &self,
        prefs: &SyncPreferences,
    ) -> Result<EnsureDriveFolderResult> {
        let meta = self.store.meta().await?;
        if let Some(id) = meta.drive_folder_id {
            // Marker creation is best effort on the fast path
            if let Err(err) = self.drive.ensure_marker_file(&id).await {
                warn!(folder_id = %id, error = %err, "could not ensure marker file");
            }
            let name = meta
                .drive_folder_name
                .unwrap_or_else(|| prefs.drive_folder_name.clone());
            return Ok(EnsureDriveFolderResult::Ok { id, name });
        }

        let markers = self
            .drive
            .find_marker_files()
            .await
            .context("searching for marker files")?;
        let mut candidates: Vec<&str> = markers
            .iter()
            .filter_map(RemoteFile::primary_parent)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        match candidates.len() {
            0 => {}
            1 => {
                let id = DriveId::new(candidates[0])?;
                let name = self
                    .drive
                    .file_metadata(&id)
                    .await?
                    .map(|f| f.name)
                    .unwrap_or_else(|| prefs.drive_folder_name.clone());
                self.store.set_drive_folder(&id, &name).await?;
                info!(folder_id = %id, name = %name, "adopted marked drive folder");
                return Ok(EnsureDriveFolderResult::Ok { id, name });
            }
            _ => {
                return Ok(EnsureDriveFolderResult::Error(
                    "Multiple Drive folders found for sync".to_string(),
                ));
            }
        }

        let by_name = self
            .drive
            .find_folders_by_name(&prefs.drive_folder_name)
            .await
            .context("searching folders by name")?;
        match by_name.len() {
            1 => {
                let folder = &by_name[0];
                let id = DriveId::new(folder.id.clone())?;
                if let Err(err) = self.drive.ensure_marker_file(&id).await {
                    warn!(folder_id = %id, error = %err, "could not create marker file");
                }
                self.store.set_drive_folder(&id, &folder.name).await?;
                info!(folder_id = %id, name = %folder.name, "adopted drive folder by name");
                Ok(EnsureDriveFolderResult::Ok {
                    id,
                    name: folder.name.clone(),
                })
            }
            0 => Ok(EnsureDriveFolderResult::Error(
                "Drive folder not connected".to_string(),
            )),
            _ => Ok(EnsureDriveFolderResult::Error(format!(
                "Multiple Drive folders found by name '{}'",
                prefs.drive_folder_name
            ))),
        }
    }
}
