//! Worker-facing runner
//!
//! Bridges the engine to the host's job scheduler: serializes physical
//! runs behind a `tokio::sync::Mutex`, classifies thrown errors into the
//! closed taxonomy, drives the 401 invalidate-and-retry / 403 revoke
//! flows, and writes the terminal status before reporting a decision.
//! Cancellation never reaches classification; a dropped future simply
//! ends the run.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use notedrive_core::domain::{SyncOutcome, SyncStatusState, WorkerDecision};
use notedrive_core::ports::{AuthGateway, SyncStore};

use crate::engine::SyncEngine;
use crate::error::SyncError;

/// Serialized entry point for the host's sync job
pub struct SyncRunner {
    engine: SyncEngine,
    auth: Arc<dyn AuthGateway>,
    store: Arc<dyn SyncStore>,
    run_lock: Mutex<()>,
}

impl SyncRunner {
    pub fn new(engine: SyncEngine, auth: Arc<dyn AuthGateway>, store: Arc<dyn SyncStore>) -> Self {
        Self {
            engine,
            auth,
            store,
            run_lock: Mutex::new(()),
        }
    }

    /// Runs one sync job and reports the scheduler decision
    ///
    /// Overlapping triggers queue on the lock rather than running
    /// concurrently.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> anyhow::Result<WorkerDecision> {
        let _guard = self.run_lock.lock().await;

        match self.engine.run_sync().await {
            Ok(outcome) => Ok(self.map_outcome(outcome)),
            Err(err) => self.handle_error(err).await,
        }
    }

    fn map_outcome(&self, outcome: SyncOutcome) -> WorkerDecision {
        match outcome {
            SyncOutcome::Success | SyncOutcome::Skipped => WorkerDecision::Success,
            // Preflight already wrote the status row
            SyncOutcome::Failure { .. } => WorkerDecision::Failure,
        }
    }

    async fn handle_error(&self, err: anyhow::Error) -> anyhow::Result<WorkerDecision> {
        let classified = SyncError::classify(&err);

        if classified.auth_code() == Some(401) {
            return self.retry_after_invalidation(&err).await;
        }
        if classified.auth_code() == Some(403) {
            // 403 means insufficient grant, not expiry; re-auth is the
            // only way forward
            warn!("drive rejected credentials with 403, revoking access");
            self.auth.revoke_access().await?;
            return self.finish(&classified).await;
        }
        self.finish(&classified).await
    }

    /// 401 flow: drop the cached token and give the run one more attempt
    async fn retry_after_invalidation(&self, err: &anyhow::Error) -> anyhow::Result<WorkerDecision> {
        warn!("drive rejected token with 401, invalidating and retrying once");
        self.auth.invalidate_access_token().await?;

        match self.engine.run_sync().await {
            Ok(outcome) => Ok(self.map_outcome(outcome)),
            Err(retry_err) => {
                let classified = SyncError::classify(&retry_err);
                if classified.is_auth() {
                    warn!("retry after token refresh failed again, revoking access");
                    self.auth.revoke_access().await?;
                } else {
                    info!(original = %err, "retry failed differently from the original error");
                }
                self.finish(&classified).await
            }
        }
    }

    /// Writes the terminal status row and maps to a decision
    async fn finish(&self, classified: &SyncError) -> anyhow::Result<WorkerDecision> {
        let decision = classified.decide();
        error!(error = %classified, ?decision, "sync run failed");
        self.store
            .set_status(
                SyncStatusState::Error,
                Some(classified.status_message()),
                None,
            )
            .await?;
        Ok(decision)
    }
}
