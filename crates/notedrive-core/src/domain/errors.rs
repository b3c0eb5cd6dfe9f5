//! Domain error types
//!
//! Validation failures raised when constructing domain newtypes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid local relative path format or content
    #[error("Invalid relative path: {0}")]
    InvalidRelPath(String),

    /// Invalid remote drive identifier
    #[error("Invalid drive ID: {0}")]
    InvalidDriveId(String),

    /// Invalid change-feed page token
    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidRelPath("/abs/path".to_string());
        assert_eq!(err.to_string(), "Invalid relative path: /abs/path");

        let err = DomainError::InvalidDriveId(String::new());
        assert_eq!(err.to_string(), "Invalid drive ID: ");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidPageToken("x".to_string());
        let err2 = DomainError::InvalidPageToken("x".to_string());
        assert_eq!(err1, err2);
    }
}
