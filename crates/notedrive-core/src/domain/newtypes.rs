//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers the sync engine passes
//! around: local relative paths, remote drive IDs, and change-feed cursors.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RelPath
// ============================================================================

/// A validated local path relative to the sync root
///
/// `RelPath` is the primary key of the sync bookkeeping: one `SyncItem` per
/// tracked file, one `SyncFolder` per tracked directory. Paths use `/`
/// separators regardless of platform and are guaranteed to be:
/// - Non-empty
/// - Relative (no leading `/`)
/// - Free of `.` / `..` components, backslashes, and empty segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Create a new RelPath, validating its shape
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRelPath` if the path is absolute, empty,
    /// or contains traversal/empty components.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if path.is_empty() {
            return Err(DomainError::InvalidRelPath(
                "Path cannot be empty".to_string(),
            ));
        }
        if path.starts_with('/') {
            return Err(DomainError::InvalidRelPath(format!(
                "Path must be relative: {path}"
            )));
        }
        if path.contains('\\') {
            return Err(DomainError::InvalidRelPath(format!(
                "Path must use '/' separators: {path}"
            )));
        }
        for segment in path.split('/') {
            if segment.is_empty() {
                return Err(DomainError::InvalidRelPath(format!(
                    "Path contains an empty segment: {path}"
                )));
            }
            if segment == "." || segment == ".." {
                return Err(DomainError::InvalidRelPath(format!(
                    "Path contains a traversal segment: {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a single file/folder name onto this path
    ///
    /// # Errors
    /// Returns an error if the name itself is not a valid single segment.
    pub fn join(&self, name: &str) -> Result<Self, DomainError> {
        Self::new(format!("{}/{name}", self.0))
    }

    /// Build a path from an optional parent directory and a name
    ///
    /// A `None` parent means the name lives directly under the sync root.
    pub fn under(parent: Option<&RelPath>, name: &str) -> Result<Self, DomainError> {
        match parent {
            Some(dir) => dir.join(name),
            None => Self::new(name),
        }
    }

    /// Get the parent directory, or `None` for a root-level path
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind('/').map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Get the final path segment (the file or folder name)
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Get the extension (lowercased, without the dot), if any
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rfind('.')
            .filter(|&idx| idx > 0 && idx + 1 < name.len())
            .map(|idx| name[idx + 1..].to_ascii_lowercase())
    }

    /// Returns true if this path is the given directory or lies beneath it
    #[must_use]
    pub fn is_under(&self, dir: &RelPath) -> bool {
        self.0 == dir.0 || self.0.starts_with(&format!("{}/", dir.0))
    }

    /// Rewrites the `old` directory prefix to `new`
    ///
    /// Returns `None` if this path is not under `old`. Used when a tracked
    /// folder is moved/renamed and every contained path must follow.
    #[must_use]
    pub fn replace_prefix(&self, old: &RelPath, new: &RelPath) -> Option<Self> {
        if self.0 == old.0 {
            return Some(new.clone());
        }
        self.0
            .strip_prefix(&format!("{}/", old.0))
            .map(|rest| Self(format!("{}/{rest}", new.0)))
    }
}

impl Display for RelPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelPath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

// ============================================================================
// DriveId
// ============================================================================

/// Opaque remote file/folder identifier assigned by the cloud drive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriveId(String);

impl DriveId {
    /// Create a new DriveId
    ///
    /// # Errors
    /// Returns an error if the ID is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidDriveId(
                "Drive ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DriveId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DriveId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DriveId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DriveId> for String {
    fn from(id: DriveId) -> Self {
        id.0
    }
}

// ============================================================================
// PageToken
// ============================================================================

/// Opaque change-feed cursor (`startPageToken`)
///
/// The token is opaque - we don't validate its contents, only that it's
/// non-blank. A blank/missing token means "no cursor yet, run initial sync".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageToken(String);

impl PageToken {
    /// Create a new PageToken
    ///
    /// # Errors
    /// Returns an error if the token is blank.
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::InvalidPageToken(
                "Page token cannot be blank".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PageToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageToken {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PageToken {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PageToken> for String {
    fn from(token: PageToken) -> Self {
        token.0
    }
}

// ============================================================================
// Tests
// ============================================================================
