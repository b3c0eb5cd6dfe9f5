//! Drive gateway port
//!
//! Interface to the remote cloud-drive REST API: folder/file CRUD, marker
//! handling, and the paginated change feed. The API is eventually
//! consistent and rate limited; adapters map raw transport failures into
//! `anyhow` errors the engine classifies.
//!
//! ## Design Notes
//!
//! - `RemoteFile` is a port-level DTO, not a domain entity; use cases map
//!   it onto `SyncItem`/`SyncFolder` records.
//! - Upload strategy is the adapter's concern, but the threshold is fixed
//!   here: payloads at or below [`RESUMABLE_UPLOAD_THRESHOLD`] go out as a
//!   single multipart request, larger payloads through a resumable session
//!   (initiate with metadata, receive a session location, stream content).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DriveId, PageToken, RelPath};

/// Payloads at or below this size upload as one multipart request;
/// larger payloads use a resumable session.
pub const RESUMABLE_UPLOAD_THRESHOLD: usize = 256 * 1024;

/// App property marking a remote folder as a NoteDrive sync target,
/// independent of its display name
pub const APP_PROPERTY_MARKER: &str = "notedriveSyncRoot";

/// App property stamped on uploaded files with their local relative path,
/// used to recover identity across remote folder renames
pub const APP_PROPERTY_LOCAL_PATH: &str = "notedriveLocalPath";

// ============================================================================
// DTOs
// ============================================================================

/// Remote file/folder metadata as returned by the drive API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub modified: Option<DateTime<Utc>>,
    pub trashed: bool,
    /// Parent folder ids (the API allows several; the first is canonical)
    pub parents: Vec<String>,
    pub app_properties: HashMap<String, String>,
    pub is_folder: bool,
}

impl RemoteFile {
    /// Returns the first parent id, if any
    pub fn primary_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// One page of a folder listing
#[derive(Debug, Clone)]
pub struct FileListPage {
    pub files: Vec<RemoteFile>,
    pub next_page_token: Option<String>,
}

/// One entry of the change feed
#[derive(Debug, Clone)]
pub struct ChangeEntry {
    /// Id of the changed remote file/folder
    pub file_id: String,
    /// True when the item was removed outright (no metadata available)
    pub removed: bool,
    /// Full metadata, when the page embedded it
    pub file: Option<RemoteFile>,
}

/// One page of the change feed
///
/// `new_start_page_token` is only present on the final page of a feed
/// sequence; intermediate pages carry `next_page_token` instead.
#[derive(Debug, Clone)]
pub struct ChangePage {
    pub changes: Vec<ChangeEntry>,
    pub next_page_token: Option<String>,
    pub new_start_page_token: Option<String>,
}

/// Content upload request (create when `file_id` is `None`, else update)
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_id: Option<DriveId>,
    pub parent_id: DriveId,
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    /// App properties to stamp; always includes [`APP_PROPERTY_LOCAL_PATH`]
    pub app_properties: HashMap<String, String>,
}

impl UploadRequest {
    /// Builds an upload request stamped with the file's local path property
    pub fn for_note(
        file_id: Option<DriveId>,
        parent_id: DriveId,
        name: String,
        mime_type: String,
        content: Vec<u8>,
        local_path: &RelPath,
    ) -> Self {
        let mut app_properties = HashMap::new();
        app_properties.insert(
            APP_PROPERTY_LOCAL_PATH.to_string(),
            local_path.as_str().to_string(),
        );
        Self {
            file_id,
            parent_id,
            name,
            mime_type,
            content,
            app_properties,
        }
    }
}

// ============================================================================
// DriveGateway trait
// ============================================================================

/// Port trait for all remote drive operations
///
/// All listing operations are paginated; callers loop page-by-page within
/// one run. Implementations own auth-header plumbing and transport retry
/// concerns below the level the engine classifies.
#[async_trait::async_trait]
pub trait DriveGateway: Send + Sync {
    /// Finds marker files (zero-byte files tagged with
    /// [`APP_PROPERTY_MARKER`]) anywhere in the drive. Their parent folders
    /// are candidate sync roots.
    async fn find_marker_files(&self) -> anyhow::Result<Vec<RemoteFile>>;

    /// Finds non-trashed folders with the given display name
    async fn find_folders_by_name(&self, name: &str) -> anyhow::Result<Vec<RemoteFile>>;

    /// Creates the marker file under the folder if it doesn't exist yet
    async fn ensure_marker_file(&self, folder_id: &DriveId) -> anyhow::Result<()>;

    /// Lists one page of a folder's children
    async fn list_children(
        &self,
        folder_id: &DriveId,
        page_token: Option<&str>,
    ) -> anyhow::Result<FileListPage>;

    /// Finds a non-trashed child by exact name within a folder
    async fn find_child_by_name(
        &self,
        folder_id: &DriveId,
        name: &str,
    ) -> anyhow::Result<Option<RemoteFile>>;

    /// Creates a folder and returns its metadata
    async fn create_folder(&self, parent_id: &DriveId, name: &str) -> anyhow::Result<RemoteFile>;

    /// Creates or updates file content; chooses multipart vs resumable
    /// session by [`RESUMABLE_UPLOAD_THRESHOLD`]
    async fn create_or_update_file(&self, request: UploadRequest) -> anyhow::Result<RemoteFile>;

    /// Moves a remote file to the drive trash
    async fn trash_file(&self, file_id: &DriveId) -> anyhow::Result<()>;

    /// Permanently deletes a remote file
    async fn delete_file(&self, file_id: &DriveId) -> anyhow::Result<()>;

    /// Downloads a file's content
    async fn download_file(&self, file_id: &DriveId) -> anyhow::Result<Vec<u8>>;

    /// Fetches a fresh change-feed cursor
    async fn start_page_token(&self) -> anyhow::Result<PageToken>;

    /// Lists one page of the change feed starting at the given token
    /// (either a stored cursor or a previous page's `next_page_token`)
    async fn list_changes(&self, page_token: &str) -> anyhow::Result<ChangePage>;

    /// Fetches full metadata for a single file, or `None` if it's gone
    async fn file_metadata(&self, file_id: &DriveId) -> anyhow::Result<Option<RemoteFile>>;
}
