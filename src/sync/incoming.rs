//! Upload path for files handed to the bridge directly, by dropping them
//! onto the vault or pasting them in.
//!
//! Batches run strictly one file at a time in arrival order. After a
//! successful upload a dropped file is moved into the sync directory so
//! the next reconciliation pass sees it as already present.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::events::IncomingFile;
use crate::notices::Notifier;
use crate::remote::CloudStore;
use crate::vault::mime::mime_type_for;
use crate::vault::Vault;

/// Outcome of one incoming file.
#[derive(Debug, Clone)]
pub struct IncomingOutcome {
    pub name: String,
    pub uploaded: bool,
    pub relocated: bool,
    pub message: String,
}

/// Handles dropped and pasted files one at a time.
pub struct IncomingProcessor {
    store: Arc<dyn CloudStore>,
    vault: Arc<dyn Vault>,
    notifier: Arc<dyn Notifier>,
    folder_id: String,
    sync_dir: PathBuf,
}

impl IncomingProcessor {
    pub fn new(
        store: Arc<dyn CloudStore>,
        vault: Arc<dyn Vault>,
        notifier: Arc<dyn Notifier>,
        folder_id: impl Into<String>,
        sync_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            vault,
            notifier,
            folder_id: folder_id.into(),
            sync_dir: sync_dir.into(),
        }
    }

    /// Upload a batch in order. Each file is awaited to completion before
    /// the next starts; a failure is reported and the batch moves on.
    pub async fn process_batch(&self, files: Vec<IncomingFile>) -> Vec<IncomingOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            outcomes.push(self.process_one(file).await);
        }
        outcomes
    }

    async fn process_one(&self, file: IncomingFile) -> IncomingOutcome {
        let IncomingFile {
            name,
            content,
            source_path,
        } = file;

        let mime_type = mime_type_for(&name);
        let size = content.len();

        match self
            .store
            .create_file(&self.folder_id, &name, &mime_type, content)
            .await
        {
            Ok(remote) => {
                info!(
                    target: "vaultdrive::sync",
                    "incoming {} uploaded ({} bytes, id {})", name, size, remote.id
                );
                self.notifier.notice(&format!("Uploaded {}", name));
                let relocated = self.relocate(&name, source_path);
                IncomingOutcome {
                    name,
                    uploaded: true,
                    relocated,
                    message: format!("uploaded as {}", mime_type),
                }
            }
            Err(err) => {
                warn!(
                    target: "vaultdrive::sync",
                    "incoming {} failed: {}", name, err
                );
                self.notifier
                    .notice(&format!("Upload of {} failed: {}", name, err.user_message()));
                IncomingOutcome {
                    name,
                    uploaded: false,
                    relocated: false,
                    message: err.user_message(),
                }
            }
        }
    }

    /// Move an uploaded file into the sync directory. Files that came in
    /// without a path (pasted content) or already live there are left
    /// alone. A failed move never undoes the upload.
    fn relocate(&self, name: &str, source_path: Option<PathBuf>) -> bool {
        let Some(source) = source_path else {
            return false;
        };
        let target = self.sync_dir.join(name);
        if source == target {
            debug!(
                target: "vaultdrive::sync",
                "{} already lives in the sync directory", name
            );
            return false;
        }
        match self.vault.rename(&source, &target) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    target: "vaultdrive::sync",
                    "could not move {} into the sync directory: {}", name, err
                );
                false
            }
        }
    }
}
