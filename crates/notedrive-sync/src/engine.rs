//! Run orchestration
//!
//! One `run_sync` call is one logical run: preflight, then either the
//! initial full reconcile (no cursor yet) or push followed by pull.
//! Push-before-pull is deliberate: local edits reach the remote side
//! before change-feed processing, so a same-pass download can't clobber a
//! pending upload and either pass may be the one that first observes a
//! conflict.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use notedrive_core::domain::{SyncOutcome, SyncStatusState};
use notedrive_core::ports::{AuthGateway, DriveGateway, LocalFsGateway, PrefsGateway, SyncStore};

use crate::initial::InitialSyncUseCase;
use crate::path_resolver::FolderPathResolver;
use crate::preflight::{PreflightOutcome, SyncPreflight};
use crate::pull::IncrementalPullUseCase;
use crate::push::IncrementalPushUseCase;

/// Transfer counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub uploaded: u32,
    pub downloaded: u32,
    pub deleted: u32,
    pub conflicts: u32,
    /// Changes skipped as unresolvable
    pub errors: u32,
}

impl RunStats {
    /// Adds another pass's counters onto this one
    pub fn merge(&mut self, other: RunStats) {
        self.uploaded += other.uploaded;
        self.downloaded += other.downloaded;
        self.deleted += other.deleted;
        self.conflicts += other.conflicts;
        self.errors += other.errors;
    }
}

/// Orchestrates preflight and the reconciliation passes
pub struct SyncEngine {
    drive: Arc<dyn DriveGateway>,
    local: Arc<dyn LocalFsGateway>,
    store: Arc<dyn SyncStore>,
    preflight: SyncPreflight,
    initial: InitialSyncUseCase,
    push: IncrementalPushUseCase,
    pull: IncrementalPullUseCase,
}

impl SyncEngine {
    pub fn new(
        prefs: Arc<dyn PrefsGateway>,
        auth: Arc<dyn AuthGateway>,
        drive: Arc<dyn DriveGateway>,
        local: Arc<dyn LocalFsGateway>,
        store: Arc<dyn SyncStore>,
    ) -> Self {
        let preflight = SyncPreflight::new(prefs, auth, drive.clone(), store.clone());
        let initial = InitialSyncUseCase::new(drive.clone(), local.clone(), store.clone());
        let push = IncrementalPushUseCase::new(drive.clone(), local.clone(), store.clone());
        let pull = IncrementalPullUseCase::new(drive.clone(), local.clone(), store.clone());
        Self {
            drive,
            local,
            store,
            preflight,
            initial,
            push,
            pull,
        }
    }

    /// Runs one full sync
    ///
    /// Terminal preflight outcomes return verbatim. Errors from the passes
    /// propagate to the caller for classification; the run's own status is
    /// only written on success.
    #[tracing::instrument(skip(self))]
    pub async fn run_sync(&self) -> Result<SyncOutcome> {
        let ctx = match self.preflight.run().await? {
            PreflightOutcome::Done(outcome) => return Ok(outcome),
            PreflightOutcome::Ready(ctx) => ctx,
        };

        // Run-scoped caches start empty for every run
        let mut resolver = FolderPathResolver::new(
            self.drive.clone(),
            self.local.clone(),
            self.store.clone(),
        );
        resolver.reset();

        let mut stats = RunStats::default();
        if ctx.start_page_token.is_none() {
            stats.merge(self.initial.run(&ctx, &mut resolver).await?);
        } else {
            stats.merge(self.push.run(&ctx, &mut resolver).await?);
            stats.merge(self.pull.run(&ctx, &mut resolver).await?);
        }

        let now = Utc::now();
        self.store
            .set_status(SyncStatusState::Synced, None, Some(now))
            .await?;
        info!(
            uploaded = stats.uploaded,
            downloaded = stats.downloaded,
            deleted = stats.deleted,
            conflicts = stats.conflicts,
            skipped = stats.errors,
            "sync run complete"
        );
        Ok(SyncOutcome::Success)
    }
}
