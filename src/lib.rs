//! VaultDrive Library
//!
//! One-way synchronization bridge between a local document vault and a
//! Google Drive folder: OAuth authorization, reconciliation passes, and
//! live mirroring of drops and deletions.

pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod notices;
pub mod remote;
pub mod sync;
pub mod vault;
pub mod watch;

// Re-export commonly used types for convenience
pub use auth::{AuthSession, AuthState, OAuthClient, TokenSet};
pub use config::{Settings, SettingsStore};
pub use error::{ErrorCategory, ErrorSeverity, VaultDriveError, VaultResult};
pub use events::{EventBus, EventKind, EventSender, IncomingFile, VaultEvent};
pub use remote::drive::DriveClient;
pub use remote::{CloudStore, RemoteFile};
pub use sync::{
    DeletionOutcome, DeletionPropagator, IncomingProcessor, PassReport, SyncEngine, UploadOutcome,
};
pub use vault::{FsVault, LocalFile, Vault};
