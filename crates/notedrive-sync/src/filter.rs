//! Note file filtering
//!
//! Only plain-text note formats sync; everything else is invisible to the
//! engine on both sides. The local `.trash` directory holds soft-deleted
//! notes and is never uploaded or reconciled.

use notedrive_core::domain::RelPath;

/// File extensions (lowercased) the engine synchronizes
pub const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt"];

/// Root-level directory holding soft-deleted local notes
pub const TRASH_DIR_NAME: &str = ".trash";

/// Returns true if the path has a supported note extension
pub fn is_supported_path(path: &RelPath) -> bool {
    match path.extension() {
        Some(ext) => SUPPORTED_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Returns true if the file name has a supported note extension
pub fn is_supported_name(name: &str) -> bool {
    name.rfind('.')
        .filter(|&idx| idx > 0 && idx + 1 < name.len())
        .map(|idx| {
            SUPPORTED_EXTENSIONS.contains(&name[idx + 1..].to_ascii_lowercase().as_str())
        })
        .unwrap_or(false)
}

/// Returns true if the path lies inside the local trash subtree
pub fn is_ignored_path(path: &RelPath) -> bool {
    path.as_str() == TRASH_DIR_NAME
        || path.as_str().starts_with(&format!("{TRASH_DIR_NAME}/"))
}

/// MIME type to upload a note with, derived from its extension
pub fn mime_type_for(path: &RelPath) -> &'static str {
    match path.extension().as_deref() {
        Some("md") => "text/markdown",
        _ => "text/plain",
    }
}
