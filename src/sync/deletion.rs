//! Propagates local deletions to the remote folder.
//!
//! A name removed from the vault is looked up remotely and deleted when
//! found. Nothing remote to match is the normal case for files that were
//! never uploaded, so it stays quiet.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{VaultDriveError, VaultResult};
use crate::notices::Notifier;
use crate::remote::CloudStore;

/// What happened to one propagated deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The remote counterpart was deleted.
    Deleted { file_id: String },
    /// No remote file carried the name.
    NoMatch,
}

/// Mirrors vault deletions into the remote folder.
pub struct DeletionPropagator {
    store: Arc<dyn CloudStore>,
    notifier: Arc<dyn Notifier>,
    folder_id: String,
}

impl DeletionPropagator {
    pub fn new(
        store: Arc<dyn CloudStore>,
        notifier: Arc<dyn Notifier>,
        folder_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            folder_id: folder_id.into(),
        }
    }

    /// Delete the remote file named `name`, if one exists.
    ///
    /// When several remote files share the name the first listed one is
    /// removed. A file that disappears between the listing and the delete
    /// call counts as no match.
    pub async fn propagate(&self, name: &str) -> VaultResult<DeletionOutcome> {
        let files = match self.store.list_files(&self.folder_id).await {
            Ok(files) => files,
            Err(err) => {
                self.notify_failure(name, &err);
                return Err(err);
            }
        };

        let Some(target) = files.into_iter().find(|f| f.name == name) else {
            debug!(
                target: "vaultdrive::sync",
                "no remote counterpart for deleted {}", name
            );
            return Ok(DeletionOutcome::NoMatch);
        };

        match self.store.delete_file(&target.id).await {
            Ok(()) => {
                info!(
                    target: "vaultdrive::sync",
                    "deleted remote {} (id {})", name, target.id
                );
                self.notifier.notice(&format!("Deleted {} from Drive", name));
                Ok(DeletionOutcome::Deleted { file_id: target.id })
            }
            Err(VaultDriveError::NotFound { .. }) => {
                debug!(
                    target: "vaultdrive::sync",
                    "remote {} was already gone", name
                );
                Ok(DeletionOutcome::NoMatch)
            }
            Err(err) => {
                self.notify_failure(name, &err);
                Err(err)
            }
        }
    }

    fn notify_failure(&self, name: &str, err: &VaultDriveError) {
        warn!(
            target: "vaultdrive::sync",
            "deletion of {} failed: {}", name, err
        );
        self.notifier
            .notice(&format!("Could not delete {} from Drive: {}", name, err.user_message()));
    }
}
