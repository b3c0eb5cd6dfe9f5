//! Gateway ports (driven/secondary ports)
//!
//! Narrow trait interfaces wrapping the platform clients the sync engine
//! depends on. Production adapters wrap concrete clients (REST, storage
//! framework, relational store); tests inject deterministic in-memory fakes.

pub mod auth;
pub mod drive;
pub mod local_fs;
pub mod prefs;
pub mod store;

pub use auth::AuthGateway;
pub use drive::{
    ChangeEntry, ChangePage, DriveGateway, FileListPage, RemoteFile, UploadRequest,
    APP_PROPERTY_LOCAL_PATH, APP_PROPERTY_MARKER, RESUMABLE_UPLOAD_THRESHOLD,
};
pub use local_fs::{LocalFileMeta, LocalFsGateway, StorageUnavailable};
pub use prefs::PrefsGateway;
pub use store::SyncStore;
