//! In-memory gateway fakes shared by the integration tests
//!
//! Deterministic stand-ins for all five gateways: a remote drive with an
//! explicit change-page queue, a local tree keyed by path, and a plain-map
//! store. Tests seed state directly and assert on recorded calls.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use notedrive_core::domain::{
    DriveId, PageToken, RelPath, SyncFolder, SyncItem, SyncMeta, SyncPreferences,
    SyncStatusState,
};
use notedrive_core::ports::{
    AuthGateway, ChangeEntry, ChangePage, DriveGateway, FileListPage, LocalFileMeta,
    LocalFsGateway, PrefsGateway, RemoteFile, StorageUnavailable, SyncStore, UploadRequest,
    APP_PROPERTY_MARKER,
};
use notedrive_sync::DriveApiStatus;

pub fn ts(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub fn p(s: &str) -> RelPath {
    RelPath::new(s).unwrap()
}

pub fn id(s: &str) -> DriveId {
    DriveId::new(s).unwrap()
}

pub fn remote_note(id: &str, name: &str, parent: &str, modified: i64) -> RemoteFile {
    RemoteFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: "text/plain".to_string(),
        modified: Some(ts(modified)),
        trashed: false,
        parents: vec![parent.to_string()],
        app_properties: HashMap::new(),
        is_folder: false,
    }
}

pub fn remote_folder(id: &str, name: &str, parent: &str) -> RemoteFile {
    RemoteFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: "application/vnd.google-apps.folder".to_string(),
        modified: None,
        trashed: false,
        parents: vec![parent.to_string()],
        app_properties: HashMap::new(),
        is_folder: true,
    }
}

pub fn change(file: RemoteFile) -> ChangeEntry {
    ChangeEntry {
        file_id: file.id.clone(),
        removed: false,
        file: Some(file),
    }
}

pub fn removal(file_id: &str) -> ChangeEntry {
    ChangeEntry {
        file_id: file_id.to_string(),
        removed: true,
        file: None,
    }
}

pub fn page(changes: Vec<ChangeEntry>, next: Option<&str>, new_start: Option<&str>) -> ChangePage {
    ChangePage {
        changes,
        next_page_token: next.map(str::to_string),
        new_start_page_token: new_start.map(str::to_string),
    }
}

// ============================================================================
// FakePrefs
// ============================================================================

pub struct FakePrefs {
    pub prefs: Mutex<SyncPreferences>,
}

impl FakePrefs {
    pub fn enabled() -> Self {
        let prefs = SyncPreferences {
            enabled: true,
            local_root: Some("content://root".to_string()),
            ..SyncPreferences::default()
        };
        Self {
            prefs: Mutex::new(prefs),
        }
    }

    pub fn with(prefs: SyncPreferences) -> Self {
        Self {
            prefs: Mutex::new(prefs),
        }
    }
}

#[async_trait]
impl PrefsGateway for FakePrefs {
    async fn preferences(&self) -> anyhow::Result<SyncPreferences> {
        Ok(self.prefs.lock().unwrap().clone())
    }
}

// ============================================================================
// FakeAuth
// ============================================================================

pub struct FakeAuth {
    pub token: Mutex<Option<String>>,
    pub invalidations: AtomicU32,
    pub revocations: AtomicU32,
}

impl FakeAuth {
    pub fn signed_in() -> Self {
        Self {
            token: Mutex::new(Some("token-1".to_string())),
            invalidations: AtomicU32::new(0),
            revocations: AtomicU32::new(0),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            token: Mutex::new(None),
            invalidations: AtomicU32::new(0),
            revocations: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl AuthGateway for FakeAuth {
    async fn access_token(&self) -> anyhow::Result<Option<String>> {
        Ok(self.token.lock().unwrap().clone())
    }

    async fn invalidate_access_token(&self) -> anyhow::Result<bool> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.lock().unwrap().is_some())
    }

    async fn revoke_access(&self) -> anyhow::Result<()> {
        self.revocations.fetch_add(1, Ordering::SeqCst);
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

// ============================================================================
// FakeDrive
// ============================================================================

pub const ROOT_ID: &str = "root";

#[derive(Clone)]
pub struct RemoteNode {
    pub file: RemoteFile,
    pub content: Vec<u8>,
}

#[derive(Default)]
pub struct DriveState {
    pub nodes: BTreeMap<String, RemoteNode>,
    /// Queued change pages, consumed front-first by `list_changes`
    pub pages: Vec<ChangePage>,
    pub token_counter: u64,
    pub next_id: u32,
    pub clock: i64,
    /// (parent_id, name) per `create_folder` call
    pub create_folder_calls: Vec<(String, String)>,
    pub upload_calls: u32,
    pub download_calls: u32,
    /// Fail every call with this status code
    pub fail_with: Option<u16>,
    /// Fail this many calls, then recover
    pub fail_count: u32,
}

pub struct FakeDrive {
    pub state: Mutex<DriveState>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DriveState {
                clock: 1_000,
                ..DriveState::default()
            }),
        }
    }

    /// Seeds a node, including content for files
    pub fn seed(&self, file: RemoteFile, content: &[u8]) {
        self.state.lock().unwrap().nodes.insert(
            file.id.clone(),
            RemoteNode {
                file,
                content: content.to_vec(),
            },
        );
    }

    pub fn seed_page(&self, page: ChangePage) {
        self.state.lock().unwrap().pages.push(page);
    }

    pub fn fail_with(&self, code: u16, count: u32) {
        let mut state = self.state.lock().unwrap();
        state.fail_with = Some(code);
        state.fail_count = count;
    }

    pub fn node(&self, id: &str) -> Option<RemoteNode> {
        self.state.lock().unwrap().nodes.get(id).cloned()
    }

    pub fn content_of(&self, id: &str) -> Option<Vec<u8>> {
        self.node(id).map(|n| n.content)
    }

    pub fn create_folder_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().create_folder_calls.clone()
    }

    pub fn upload_calls(&self) -> u32 {
        self.state.lock().unwrap().upload_calls
    }

    pub fn download_calls(&self) -> u32 {
        self.state.lock().unwrap().download_calls
    }

    fn check_fail(state: &mut DriveState) -> anyhow::Result<()> {
        if let Some(code) = state.fail_with {
            if state.fail_count > 0 {
                state.fail_count -= 1;
                if state.fail_count == 0 {
                    state.fail_with = None;
                }
            }
            return Err(anyhow::Error::new(DriveApiStatus::new(code, None)));
        }
        Ok(())
    }
}

#[async_trait]
impl DriveGateway for FakeDrive {
    async fn find_marker_files(&self) -> anyhow::Result<Vec<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        Ok(state
            .nodes
            .values()
            .filter(|n| {
                !n.file.trashed && n.file.app_properties.contains_key(APP_PROPERTY_MARKER)
            })
            .map(|n| n.file.clone())
            .collect())
    }

    async fn find_folders_by_name(&self, name: &str) -> anyhow::Result<Vec<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.file.is_folder && !n.file.trashed && n.file.name == name)
            .map(|n| n.file.clone())
            .collect())
    }

    async fn ensure_marker_file(&self, folder_id: &DriveId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        let exists = state.nodes.values().any(|n| {
            n.file.primary_parent() == Some(folder_id.as_str())
                && n.file.app_properties.contains_key(APP_PROPERTY_MARKER)
        });
        if !exists {
            state.next_id += 1;
            let marker_id = format!("marker-{}", state.next_id);
            let mut props = HashMap::new();
            props.insert(APP_PROPERTY_MARKER.to_string(), "1".to_string());
            let file = RemoteFile {
                id: marker_id.clone(),
                name: ".notedrive".to_string(),
                mime_type: "application/octet-stream".to_string(),
                modified: Some(ts(state.clock)),
                trashed: false,
                parents: vec![folder_id.as_str().to_string()],
                app_properties: props,
                is_folder: false,
            };
            state.nodes.insert(
                marker_id,
                RemoteNode {
                    file,
                    content: Vec::new(),
                },
            );
        }
        Ok(())
    }

    async fn list_children(
        &self,
        folder_id: &DriveId,
        _page_token: Option<&str>,
    ) -> anyhow::Result<FileListPage> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        Ok(FileListPage {
            files: state
                .nodes
                .values()
                .filter(|n| {
                    !n.file.trashed && n.file.primary_parent() == Some(folder_id.as_str())
                })
                .map(|n| n.file.clone())
                .collect(),
            next_page_token: None,
        })
    }

    async fn find_child_by_name(
        &self,
        folder_id: &DriveId,
        name: &str,
    ) -> anyhow::Result<Option<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        Ok(state
            .nodes
            .values()
            .find(|n| {
                !n.file.trashed
                    && n.file.name == name
                    && n.file.primary_parent() == Some(folder_id.as_str())
            })
            .map(|n| n.file.clone()))
    }

    async fn create_folder(
        &self,
        parent_id: &DriveId,
        name: &str,
    ) -> anyhow::Result<RemoteFile> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        state
            .create_folder_calls
            .push((parent_id.as_str().to_string(), name.to_string()));
        state.next_id += 1;
        let folder = remote_folder(
            &format!("folder-{}", state.next_id),
            name,
            parent_id.as_str(),
        );
        state.nodes.insert(
            folder.id.clone(),
            RemoteNode {
                file: folder.clone(),
                content: Vec::new(),
            },
        );
        Ok(folder)
    }

    async fn create_or_update_file(
        &self,
        request: UploadRequest,
    ) -> anyhow::Result<RemoteFile> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        state.upload_calls += 1;
        state.clock += 1;
        let modified = ts(state.clock);

        let file_id = match &request.file_id {
            Some(id) => id.as_str().to_string(),
            None => {
                state.next_id += 1;
                format!("file-{}", state.next_id)
            }
        };
        let file = RemoteFile {
            id: file_id.clone(),
            name: request.name,
            mime_type: request.mime_type,
            modified: Some(modified),
            trashed: false,
            parents: vec![request.parent_id.as_str().to_string()],
            app_properties: request.app_properties,
            is_folder: false,
        };
        state.nodes.insert(
            file_id,
            RemoteNode {
                file: file.clone(),
                content: request.content,
            },
        );
        Ok(file)
    }

    async fn trash_file(&self, file_id: &DriveId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        if let Some(node) = state.nodes.get_mut(file_id.as_str()) {
            node.file.trashed = true;
        }
        Ok(())
    }

    async fn delete_file(&self, file_id: &DriveId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        state.nodes.remove(file_id.as_str());
        Ok(())
    }

    async fn download_file(&self, file_id: &DriveId) -> anyhow::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        state.download_calls += 1;
        state
            .nodes
            .get(file_id.as_str())
            .map(|n| n.content.clone())
            .ok_or_else(|| anyhow::anyhow!("no such remote file: {file_id}"))
    }

    async fn start_page_token(&self) -> anyhow::Result<PageToken> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        state.token_counter += 1;
        Ok(PageToken::new(format!("tok-{}", state.token_counter)).unwrap())
    }

    async fn list_changes(&self, page_token: &str) -> anyhow::Result<ChangePage> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        if state.pages.is_empty() {
            return Ok(ChangePage {
                changes: Vec::new(),
                next_page_token: None,
                new_start_page_token: Some(page_token.to_string()),
            });
        }
        Ok(state.pages.remove(0))
    }

    async fn file_metadata(&self, file_id: &DriveId) -> anyhow::Result<Option<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        Self::check_fail(&mut state)?;
        Ok(state.nodes.get(file_id.as_str()).map(|n| n.file.clone()))
    }
}

// ============================================================================
// FakeLocalFs
// ============================================================================

#[derive(Clone)]
pub struct FakeFile {
    pub content: Vec<u8>,
    pub modified: DateTime<Utc>,
}

#[derive(Default)]
pub struct FsState {
    pub files: BTreeMap<String, FakeFile>,
    pub dirs: BTreeSet<String>,
    pub clock: i64,
    pub unavailable: bool,
    /// Fail `move_file` calls (exercises the copy+delete fallback)
    pub fail_moves: bool,
    /// Fail `copy_file` calls as well (exercises the keep-file path)
    pub fail_copies: bool,
}

pub struct FakeLocalFs {
    pub state: Mutex<FsState>,
}

impl FakeLocalFs {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FsState {
                clock: 1_000_000,
                ..FsState::default()
            }),
        }
    }

    /// Seeds a file with an explicit modification time
    pub fn seed_file(&self, path: &str, content: &[u8], modified: i64) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(
            path.to_string(),
            FakeFile {
                content: content.to_vec(),
                modified: ts(modified),
            },
        );
        Self::add_parent_dirs(&mut state, path);
    }

    pub fn set_unavailable(&self) {
        self.state.lock().unwrap().unavailable = true;
    }

    pub fn set_fail_moves(&self, fail: bool) {
        self.state.lock().unwrap().fail_moves = fail;
    }

    pub fn set_fail_copies(&self, fail: bool) {
        self.state.lock().unwrap().fail_copies = fail;
    }

    pub fn content_of(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| f.content.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }

    fn add_parent_dirs(state: &mut FsState, path: &str) {
        let mut prefix = String::new();
        for segment in path.split('/').collect::<Vec<_>>().split_last().unwrap().1 {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            state.dirs.insert(prefix.clone());
        }
    }

    fn check_available(state: &FsState) -> anyhow::Result<()> {
        if state.unavailable {
            return Err(anyhow::Error::new(StorageUnavailable));
        }
        Ok(())
    }

    fn hash_bytes(content: &[u8]) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        content.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

#[async_trait]
impl LocalFsGateway for FakeLocalFs {
    async fn list_files(&self) -> anyhow::Result<Vec<LocalFileMeta>> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state
            .files
            .iter()
            .map(|(path, file)| LocalFileMeta {
                path: p(path),
                modified: file.modified,
                size: file.content.len() as u64,
            })
            .collect())
    }

    async fn file_meta(&self, path: &RelPath) -> anyhow::Result<Option<LocalFileMeta>> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state.files.get(path.as_str()).map(|f| LocalFileMeta {
            path: path.clone(),
            modified: f.modified,
            size: f.content.len() as u64,
        }))
    }

    async fn exists(&self, path: &RelPath) -> anyhow::Result<bool> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state.files.contains_key(path.as_str()) || state.dirs.contains(path.as_str()))
    }

    async fn read_file(&self, path: &RelPath) -> anyhow::Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state
            .files
            .get(path.as_str())
            .map(|f| f.content.clone())
            .ok_or_else(|| anyhow::anyhow!("no such local file: {path}"))
    }

    async fn write_file(&self, path: &RelPath, data: &[u8]) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state.clock += 1;
        let modified = ts(state.clock);
        state.files.insert(
            path.as_str().to_string(),
            FakeFile {
                content: data.to_vec(),
                modified,
            },
        );
        Self::add_parent_dirs(&mut state, path.as_str());
        Ok(())
    }

    async fn compute_hash(&self, path: &RelPath) -> anyhow::Result<String> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state
            .files
            .get(path.as_str())
            .map(|f| Self::hash_bytes(&f.content))
            .ok_or_else(|| anyhow::anyhow!("no such local file: {path}"))
    }

    async fn move_file(&self, from: &RelPath, to: &RelPath) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        if state.fail_moves {
            return Err(anyhow::anyhow!("move not supported"));
        }
        let file = state
            .files
            .remove(from.as_str())
            .ok_or_else(|| anyhow::anyhow!("no such local file: {from}"))?;
        state.files.insert(to.as_str().to_string(), file);
        Self::add_parent_dirs(&mut state, to.as_str());
        Ok(())
    }

    async fn copy_file(&self, from: &RelPath, to: &RelPath) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        if state.fail_copies {
            return Err(anyhow::anyhow!("copy not supported"));
        }
        let file = state
            .files
            .get(from.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such local file: {from}"))?;
        state.files.insert(to.as_str().to_string(), file);
        Self::add_parent_dirs(&mut state, to.as_str());
        Ok(())
    }

    async fn delete_file(&self, path: &RelPath) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state.files.remove(path.as_str());
        Ok(())
    }

    async fn ensure_dir(&self, path: &RelPath) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        let owned = path.as_str().to_string();
        Self::add_parent_dirs(&mut state, &format!("{owned}/x"));
        Ok(())
    }

    async fn delete_dir_if_empty(&self, path: &RelPath) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        let prefix = format!("{}/", path.as_str());
        let occupied = state.files.keys().any(|k| k.starts_with(&prefix));
        if occupied {
            return Ok(false);
        }
        state.dirs.remove(path.as_str());
        Ok(true)
    }

    fn sanitize_file_name(&self, name: &str) -> String {
        name.chars()
            .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
            .filter(|c| !c.is_control())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

// ============================================================================
// FakeStore
// ============================================================================

#[derive(Default)]
pub struct StoreState {
    pub items: BTreeMap<String, SyncItem>,
    pub folders: BTreeMap<String, SyncFolder>,
    pub meta: SyncMeta,
    pub statuses: Vec<(SyncStatusState, Option<String>)>,
}

pub struct FakeStore {
    pub state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn linked(folder_id: &str, cursor: Option<&str>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap();
            state.meta.drive_folder_id = Some(id(folder_id));
            state.meta.drive_folder_name = Some("NoteDrive".to_string());
            state.meta.start_page_token = cursor.map(|c| PageToken::new(c).unwrap());
        }
        store
    }

    pub fn seed_item(&self, item: SyncItem) {
        self.state
            .lock()
            .unwrap()
            .items
            .insert(item.local_path.as_str().to_string(), item);
    }

    pub fn seed_folder(&self, folder: SyncFolder) {
        self.state
            .lock()
            .unwrap()
            .folders
            .insert(folder.local_path.as_str().to_string(), folder);
    }

    pub fn item(&self, path: &str) -> Option<SyncItem> {
        self.state.lock().unwrap().items.get(path).cloned()
    }

    pub fn items(&self) -> Vec<SyncItem> {
        self.state.lock().unwrap().items.values().cloned().collect()
    }

    pub fn folder(&self, path: &str) -> Option<SyncFolder> {
        self.state.lock().unwrap().folders.get(path).cloned()
    }

    pub fn cursor(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .meta
            .start_page_token
            .as_ref()
            .map(|t| t.as_str().to_string())
    }

    pub fn last_status(&self) -> Option<(SyncStatusState, Option<String>)> {
        self.state.lock().unwrap().statuses.last().cloned()
    }

    fn matches_prefix(path: &str, prefix: &str) -> bool {
        path == prefix || path.starts_with(&format!("{prefix}/"))
    }
}

#[async_trait]
impl SyncStore for FakeStore {
    async fn upsert_item(&self, item: &SyncItem) -> anyhow::Result<()> {
        self.seed_item(item.clone());
        Ok(())
    }

    async fn item_by_path(&self, path: &RelPath) -> anyhow::Result<Option<SyncItem>> {
        Ok(self.item(path.as_str()))
    }

    async fn item_by_drive_id(&self, drive_id: &DriveId) -> anyhow::Result<Option<SyncItem>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .items
            .values()
            .find(|i| i.drive_file_id.as_ref() == Some(drive_id))
            .cloned())
    }

    async fn items_with_path_prefix(&self, prefix: &RelPath) -> anyhow::Result<Vec<SyncItem>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|(path, _)| Self::matches_prefix(path, prefix.as_str()))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn all_items(&self) -> anyhow::Result<Vec<SyncItem>> {
        Ok(self.items())
    }

    async fn delete_item(&self, path: &RelPath) -> anyhow::Result<()> {
        self.state.lock().unwrap().items.remove(path.as_str());
        Ok(())
    }

    async fn upsert_folder(&self, folder: &SyncFolder) -> anyhow::Result<()> {
        self.seed_folder(folder.clone());
        Ok(())
    }

    async fn folder_by_path(&self, path: &RelPath) -> anyhow::Result<Option<SyncFolder>> {
        Ok(self.folder(path.as_str()))
    }

    async fn folder_by_drive_id(
        &self,
        drive_id: &DriveId,
    ) -> anyhow::Result<Option<SyncFolder>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .folders
            .values()
            .find(|f| &f.drive_folder_id == drive_id)
            .cloned())
    }

    async fn folders_with_path_prefix(
        &self,
        prefix: &RelPath,
    ) -> anyhow::Result<Vec<SyncFolder>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .folders
            .iter()
            .filter(|(path, _)| Self::matches_prefix(path, prefix.as_str()))
            .map(|(_, folder)| folder.clone())
            .collect())
    }

    async fn all_folders(&self) -> anyhow::Result<Vec<SyncFolder>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .folders
            .values()
            .cloned()
            .collect())
    }

    async fn delete_folder(&self, path: &RelPath) -> anyhow::Result<()> {
        self.state.lock().unwrap().folders.remove(path.as_str());
        Ok(())
    }

    async fn meta(&self) -> anyhow::Result<SyncMeta> {
        Ok(self.state.lock().unwrap().meta.clone())
    }

    async fn set_drive_folder(&self, id: &DriveId, name: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.meta.drive_folder_id = Some(id.clone());
        state.meta.drive_folder_name = Some(name.to_string());
        Ok(())
    }

    async fn set_start_page_token(&self, token: &PageToken) -> anyhow::Result<()> {
        self.state.lock().unwrap().meta.start_page_token = Some(token.clone());
        Ok(())
    }

    async fn set_last_full_scan_at(&self, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.state.lock().unwrap().meta.last_full_scan_at = Some(at);
        Ok(())
    }

    async fn set_status(
        &self,
        status: SyncStatusState,
        message: Option<String>,
        _last_synced_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        self.state.lock().unwrap().statuses.push((status, message));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

use std::sync::Arc;

use notedrive_sync::{SyncEngine, SyncRunner};

/// One fully wired engine over fakes
pub struct Harness {
    pub prefs: Arc<FakePrefs>,
    pub auth: Arc<FakeAuth>,
    pub drive: Arc<FakeDrive>,
    pub local: Arc<FakeLocalFs>,
    pub store: Arc<FakeStore>,
}

impl Harness {
    /// Linked to remote folder `root`, with the given cursor
    pub fn linked(cursor: Option<&str>) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        Self {
            prefs: Arc::new(FakePrefs::enabled()),
            auth: Arc::new(FakeAuth::signed_in()),
            drive: Arc::new(FakeDrive::new()),
            local: Arc::new(FakeLocalFs::new()),
            store: Arc::new(FakeStore::linked(ROOT_ID, cursor)),
        }
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(
            self.prefs.clone(),
            self.auth.clone(),
            self.drive.clone(),
            self.local.clone(),
            self.store.clone(),
        )
    }

    pub fn runner(&self) -> SyncRunner {
        SyncRunner::new(self.engine(), self.auth.clone(), self.store.clone())
    }
}
