//! Auth gateway port
//!
//! Access-token lifecycle only; the OAuth sign-in flow itself belongs to
//! the host app and is out of scope here.

/// Port trait for access-token lifecycle operations
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    /// Returns a usable access token, or `None` if the user is signed out
    async fn access_token(&self) -> anyhow::Result<Option<String>>;

    /// Drops the cached token so the next `access_token` call mints a
    /// fresh one. Returns true if a token was actually invalidated.
    async fn invalidate_access_token(&self) -> anyhow::Result<bool>;

    /// Revokes the stored authorization entirely; the user must sign in
    /// again before sync can resume.
    async fn revoke_access(&self) -> anyhow::Result<()>;
}
