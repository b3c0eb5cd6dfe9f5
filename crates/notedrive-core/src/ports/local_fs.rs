//! Local filesystem gateway port
//!
//! All local note I/O goes through this interface, keyed by an opaque root
//! handle the adapter owns plus a [`RelPath`] beneath it. The engine never
//! sees absolute paths; storage-framework quirks (document trees, content
//! URIs) stay inside the adapter.
//!
//! ## Storage loss
//!
//! When the root handle is no longer accessible (permission revoked, volume
//! unmounted), adapters surface [`StorageUnavailable`] through the `anyhow`
//! chain. The engine treats it as fatal-for-this-run: it must propagate out
//! of the push pass before any remote deletes execute, so a lost permission
//! never reads as "everything was deleted locally".

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::RelPath;

/// Marker error: the local root handle is no longer accessible
///
/// Detected by downcasting the `anyhow` chain
/// (`err.chain().any(|c| c.is::<StorageUnavailable>())`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Local storage is unavailable")]
pub struct StorageUnavailable;

/// Metadata snapshot of one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileMeta {
    pub path: RelPath,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// Port trait for local file operations under the sync root
#[async_trait::async_trait]
pub trait LocalFsGateway: Send + Sync {
    /// Recursively lists all regular files under the root
    async fn list_files(&self) -> anyhow::Result<Vec<LocalFileMeta>>;

    /// Returns metadata for one file, or `None` if it doesn't exist
    async fn file_meta(&self, path: &RelPath) -> anyhow::Result<Option<LocalFileMeta>>;

    /// Returns true if a file or directory exists at the path
    async fn exists(&self, path: &RelPath) -> anyhow::Result<bool>;

    /// Reads the entire content of a file
    async fn read_file(&self, path: &RelPath) -> anyhow::Result<Vec<u8>>;

    /// Writes content to a file, creating it and its parent directories
    /// as needed; existing content is replaced
    async fn write_file(&self, path: &RelPath, data: &[u8]) -> anyhow::Result<()>;

    /// Computes the content digest of a file
    async fn compute_hash(&self, path: &RelPath) -> anyhow::Result<String>;

    /// Moves/renames a file, creating target parent directories as needed
    async fn move_file(&self, from: &RelPath, to: &RelPath) -> anyhow::Result<()>;

    /// Copies a file, creating target parent directories as needed
    async fn copy_file(&self, from: &RelPath, to: &RelPath) -> anyhow::Result<()>;

    /// Deletes a file
    async fn delete_file(&self, path: &RelPath) -> anyhow::Result<()>;

    /// Creates a directory and all parents (idempotent)
    async fn ensure_dir(&self, path: &RelPath) -> anyhow::Result<()>;

    /// Removes a directory if it contains no files; returns true if removed
    async fn delete_dir_if_empty(&self, path: &RelPath) -> anyhow::Result<bool>;

    /// Strips characters the underlying storage cannot represent from a
    /// file name; may return an empty string for degenerate input
    fn sanitize_file_name(&self, name: &str) -> String;
}
