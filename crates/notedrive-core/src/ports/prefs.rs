//! Preferences gateway port
//!
//! Read-only view of the host app's preference store. The engine fetches a
//! fresh snapshot at the start of every run rather than caching across runs.

use crate::domain::SyncPreferences;

/// Port trait for reading the user's sync configuration
#[async_trait::async_trait]
pub trait PrefsGateway: Send + Sync {
    /// Returns the current sync preferences snapshot
    async fn preferences(&self) -> anyhow::Result<SyncPreferences>;
}
