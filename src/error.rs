//! Unified error handling for the vaultdrive project
//!
//! Every fallible path in the crate reports through [`VaultDriveError`] so
//! the CLI and the event handlers can classify failures the same way.

use std::io;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum VaultDriveError {
    /// Configuration errors (missing credentials, unusable settings file)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authorization and token lifecycle errors
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport-level network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        url: Option<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote API replied with a non-success status
    #[error("Remote API error (HTTP {status}): {message}")]
    RemoteApi { status: u16, message: String },

    /// A remote object addressed by id does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Local filesystem errors
    #[error("Local I/O error: {message} (path: {path})")]
    LocalIo {
        message: String,
        path: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Auth,
    Network,
    RemoteApi,
    NotFound,
    LocalIo,
}

impl ErrorCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            ErrorCategory::Config => "Configuration",
            ErrorCategory::Auth => "Authentication",
            ErrorCategory::Network => "Network",
            ErrorCategory::RemoteApi => "Remote API",
            ErrorCategory::NotFound => "Not Found",
            ErrorCategory::LocalIo => "Local I/O",
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl VaultDriveError {
    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            VaultDriveError::Config { .. } => ErrorCategory::Config,
            VaultDriveError::Auth { .. } => ErrorCategory::Auth,
            VaultDriveError::Network { .. } => ErrorCategory::Network,
            VaultDriveError::RemoteApi { .. } => ErrorCategory::RemoteApi,
            VaultDriveError::NotFound { .. } => ErrorCategory::NotFound,
            VaultDriveError::LocalIo { .. } => ErrorCategory::LocalIo,
        }
    }

    /// Get error severity
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VaultDriveError::Config { .. } => ErrorSeverity::High,
            VaultDriveError::Auth { .. } => ErrorSeverity::High,
            VaultDriveError::Network { .. } => ErrorSeverity::Medium,
            VaultDriveError::RemoteApi { .. } => ErrorSeverity::Medium,
            VaultDriveError::NotFound { .. } => ErrorSeverity::Low,
            VaultDriveError::LocalIo { .. } => ErrorSeverity::Medium,
        }
    }

    /// Transient errors are worth retrying on a later pass; the rest need
    /// user action first.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VaultDriveError::Network { .. } | VaultDriveError::RemoteApi { .. }
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            VaultDriveError::Config { message, .. } => {
                format!("Configuration problem: {}", message)
            }
            VaultDriveError::Auth { message, .. } => {
                format!("Google Drive authentication required: {}", message)
            }
            VaultDriveError::Network { message, .. } => {
                format!("Network issue: {}", message)
            }
            VaultDriveError::RemoteApi { status, message } => {
                format!("Google Drive request failed (HTTP {}): {}", status, message)
            }
            VaultDriveError::NotFound { resource } => {
                format!("Remote object not found: {}", resource)
            }
            VaultDriveError::LocalIo { message, path, .. } => {
                format!("File system problem with {}: {}", path, message)
            }
        }
    }
}

impl From<io::Error> for VaultDriveError {
    fn from(err: io::Error) -> Self {
        VaultDriveError::LocalIo {
            message: format!("I/O error: {err}"),
            path: "<io>".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for VaultDriveError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string());
        VaultDriveError::Network {
            message: err.to_string(),
            url,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for VaultDriveError {
    fn from(err: serde_json::Error) -> Self {
        VaultDriveError::Config {
            message: format!("JSON error: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for convenience
pub type VaultResult<T> = Result<T, VaultDriveError>;

/// Convenience functions for creating common errors
pub mod errors {
    use super::*;

    pub fn config_error(message: impl Into<String>) -> VaultDriveError {
        VaultDriveError::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn auth_error(message: impl Into<String>) -> VaultDriveError {
        VaultDriveError::Auth {
            message: message.into(),
            source: None,
        }
    }

    pub fn auth_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> VaultDriveError {
        VaultDriveError::Auth {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn network_error(message: impl Into<String>) -> VaultDriveError {
        VaultDriveError::Network {
            message: message.into(),
            url: None,
            source: None,
        }
    }

    pub fn remote_api_error(status: u16, message: impl Into<String>) -> VaultDriveError {
        VaultDriveError::RemoteApi {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> VaultDriveError {
        VaultDriveError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn local_io_error(
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> VaultDriveError {
        VaultDriveError::LocalIo {
            message: message.into(),
            path: path.into(),
            source: None,
        }
    }

    pub fn local_io_error_with_source(
        message: impl Into<String>,
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> VaultDriveError {
        VaultDriveError::LocalIo {
            message: message.into(),
            path: path.into(),
            source: Some(Box::new(source)),
        }
    }
}
