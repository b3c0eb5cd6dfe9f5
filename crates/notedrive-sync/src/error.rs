//! Error taxonomy and retry classification
//!
//! Gateway adapters attach [`DriveApiStatus`] / [`NetworkFailure`] markers
//! to their `anyhow` chains; the engine never inspects transport types
//! directly. At the end of a failed run [`SyncError::classify`] folds the
//! chain into one of four closed categories, and [`SyncError::decide`]
//! maps the category onto the host scheduler's retry policy.

use notedrive_core::domain::WorkerDecision;
use thiserror::Error;

/// Marker carried by drive adapters for non-2xx API responses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Drive API error {code}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct DriveApiStatus {
    /// HTTP status code of the failing call
    pub code: u16,
    /// Server-provided message, if the body carried one
    pub message: Option<String>,
    /// Server-provided reason code (e.g. `rateLimitExceeded`)
    pub reason: Option<String>,
}

impl DriveApiStatus {
    pub fn new(code: u16, message: impl Into<Option<String>>) -> Self {
        Self {
            code,
            message: message.into(),
            reason: None,
        }
    }
}

/// Marker carried by adapters for connectivity-level failures
/// (DNS, TLS, timeouts, dropped connections)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Network failure{}", detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct NetworkFailure {
    pub detail: Option<String>,
}

impl NetworkFailure {
    pub fn new(detail: impl Into<Option<String>>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

// ============================================================================
// SyncError
// ============================================================================

/// Terminal classification of a failed sync run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Connectivity failed; the run is worth retrying as-is
    #[error("Network error{}", detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Network { detail: Option<String> },

    /// The drive API rejected a call with a non-auth status
    #[error("Drive API error {code}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    DriveApi { code: u16, message: Option<String> },

    /// The drive API rejected the credentials (401/403)
    #[error("Authentication error{}", code.map(|c| format!(" ({c})")).unwrap_or_default())]
    Auth {
        code: Option<u16>,
        message: Option<String>,
    },

    /// Anything the other categories don't cover
    #[error("Unexpected error: {kind}")]
    Unexpected { kind: String, detail: String },
}

impl SyncError {
    /// Folds an `anyhow` chain into one of the four categories
    ///
    /// The first recognized marker in the chain wins; auth takes priority
    /// over the generic API category for 401/403.
    pub fn classify(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(status) = cause.downcast_ref::<DriveApiStatus>() {
                if status.code == 401 || status.code == 403 {
                    return SyncError::Auth {
                        code: Some(status.code),
                        message: status.message.clone(),
                    };
                }
                return SyncError::DriveApi {
                    code: status.code,
                    message: status.message.clone(),
                };
            }
            if let Some(net) = cause.downcast_ref::<NetworkFailure>() {
                return SyncError::Network {
                    detail: net.detail.clone(),
                };
            }
        }
        SyncError::Unexpected {
            kind: err.root_cause().to_string(),
            detail: format!("{err:#}"),
        }
    }

    /// Maps this classification onto the host's job-retry policy
    ///
    /// Auth decisions are made by the runner (token invalidation and the
    /// single retry happen there); this covers the non-auth categories.
    pub fn decide(&self) -> WorkerDecision {
        match self {
            SyncError::Network { .. } => WorkerDecision::Retry,
            SyncError::DriveApi { code, .. } if *code == 429 || *code >= 500 => {
                WorkerDecision::Retry
            }
            SyncError::DriveApi { .. } => WorkerDecision::Failure,
            SyncError::Auth { .. } => WorkerDecision::Failure,
            SyncError::Unexpected { .. } => WorkerDecision::Retry,
        }
    }

    /// Status-row message for this failure
    pub fn status_message(&self) -> String {
        match self {
            SyncError::Network { .. } => "Network error, will retry".to_string(),
            SyncError::DriveApi { code, message } => match message {
                Some(m) => format!("Drive error {code}: {m}"),
                None => format!("Drive error {code}"),
            },
            SyncError::Auth { .. } => "Sign in required".to_string(),
            SyncError::Unexpected { kind, .. } => format!("Unexpected error: {kind}"),
        }
    }

    /// Returns true for 401/403 classifications
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth { .. })
    }

    /// Returns the auth status code, if this is an auth error
    pub fn auth_code(&self) -> Option<u16> {
        match self {
            SyncError::Auth { code, .. } => *code,
            _ => None,
        }
    }
}
