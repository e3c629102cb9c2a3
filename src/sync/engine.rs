//! Reconciliation engine: compares the sync directory against the remote
//! folder and uploads whatever only exists locally.
//!
//! Matching is by exact file name. Names present on both sides are left
//! alone even when their content differs; uploads are create-only.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::error::{errors, VaultResult};
use crate::remote::CloudStore;
use crate::vault::mime::mime_type_for;
use crate::vault::{LocalFile, Vault};

const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Outcome of one attempted upload within a pass.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub name: String,
    pub uploaded: bool,
    pub file_size: Option<u64>,
    pub message: String,
}

/// Progress updates emitted while a pass runs.
#[derive(Debug, Clone)]
pub enum PassProgressEvent {
    /// Remote folder listing and local enumeration are done; uploads are
    /// about to start.
    Planned { total: usize },
    /// One file finished uploading.
    Uploaded { name: String },
    /// One file failed; the rest of the pass continues.
    Failed { name: String, message: String },
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub local_files: usize,
    pub remote_files: usize,
    pub planned_uploads: usize,
    pub uploaded_files: usize,
    pub failed_uploads: usize,
    pub total_bytes_uploaded: u64,
    pub results: Vec<UploadOutcome>,
}

/// Drives list-compare-upload cycles against one remote folder.
pub struct SyncEngine {
    store: Arc<dyn CloudStore>,
    vault: Arc<dyn Vault>,
    folder_id: String,
    sync_dir: PathBuf,
    upload_concurrency: usize,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn CloudStore>,
        vault: Arc<dyn Vault>,
        folder_id: impl Into<String>,
        sync_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            vault,
            folder_id: folder_id.into(),
            sync_dir: sync_dir.into(),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }

    /// Cap the number of uploads in flight at once within a pass.
    pub fn with_upload_concurrency(mut self, limit: usize) -> Self {
        self.upload_concurrency = limit.max(1);
        self
    }

    fn check_configured(&self) -> VaultResult<()> {
        if self.folder_id.is_empty() {
            return Err(errors::config_error(
                "No Drive folder configured. Set folder_id in the settings file.",
            ));
        }
        if self.sync_dir.as_os_str().is_empty() {
            return Err(errors::config_error(
                "No sync directory configured. Set file_directory in the settings file.",
            ));
        }
        Ok(())
    }

    /// List both sides and compute the upload set without executing it.
    ///
    /// A missing or unreadable sync directory counts as empty: the pass
    /// still runs so deletions and remote state stay observable.
    async fn plan_inner(&self) -> VaultResult<(Vec<LocalFile>, usize, usize)> {
        self.check_configured()?;

        let remote_files = self.store.list_files(&self.folder_id).await?;
        let remote_names: HashSet<&str> = remote_files.iter().map(|f| f.name.as_str()).collect();

        let local_files = match self.vault.list_children(&self.sync_dir) {
            Ok(files) => files,
            Err(err) => {
                error!(
                    target: "vaultdrive::sync",
                    "cannot enumerate sync directory {}: {}",
                    self.sync_dir.display(),
                    err
                );
                Vec::new()
            }
        };
        let local_count = local_files.len();

        // Keyed by name: equal names collapse to the last enumerated record.
        let mut by_name = BTreeMap::new();
        for file in local_files {
            by_name.insert(file.name.clone(), file);
        }

        let plan: Vec<LocalFile> = by_name
            .into_values()
            .filter(|file| !remote_names.contains(file.name.as_str()))
            .collect();

        Ok((plan, local_count, remote_files.len()))
    }

    /// The files a pass would upload right now.
    pub async fn plan(&self) -> VaultResult<Vec<LocalFile>> {
        let (plan, _, _) = self.plan_inner().await?;
        Ok(plan)
    }

    /// Run one reconciliation pass.
    pub async fn run_pass(&self) -> VaultResult<PassReport> {
        self.run_pass_with_observer(|_| {}).await
    }

    /// Run one reconciliation pass, reporting progress through `observer`.
    ///
    /// Uploads are scheduled concurrently up to the configured limit. Each
    /// file succeeds or fails on its own; a failure never aborts the pass.
    pub async fn run_pass_with_observer<F>(&self, mut observer: F) -> VaultResult<PassReport>
    where
        F: FnMut(PassProgressEvent),
    {
        let (plan, local_count, remote_count) = self.plan_inner().await?;

        info!(
            target: "vaultdrive::sync",
            "pass planned: {} local, {} remote, {} to upload",
            local_count,
            remote_count,
            plan.len()
        );
        observer(PassProgressEvent::Planned { total: plan.len() });

        let mut report = PassReport {
            local_files: local_count,
            remote_files: remote_count,
            planned_uploads: plan.len(),
            uploaded_files: 0,
            failed_uploads: 0,
            total_bytes_uploaded: 0,
            results: Vec::with_capacity(plan.len()),
        };

        let semaphore = Arc::new(Semaphore::new(self.upload_concurrency));
        let mut handles = Vec::with_capacity(plan.len());

        for file in plan {
            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let vault = self.vault.clone();
            let folder_id = self.folder_id.clone();

            handles.push(tokio::spawn(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => upload_one(store, vault, folder_id, file).await,
                    Err(_) => UploadOutcome {
                        name: file.name,
                        uploaded: false,
                        file_size: None,
                        message: "upload slot unavailable".to_string(),
                    },
                }
            }));
        }

        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => UploadOutcome {
                    name: String::new(),
                    uploaded: false,
                    file_size: None,
                    message: format!("upload task aborted: {}", join_err),
                },
            };

            if outcome.uploaded {
                report.uploaded_files += 1;
                report.total_bytes_uploaded += outcome.file_size.unwrap_or(0);
                observer(PassProgressEvent::Uploaded {
                    name: outcome.name.clone(),
                });
            } else {
                report.failed_uploads += 1;
                observer(PassProgressEvent::Failed {
                    name: outcome.name.clone(),
                    message: outcome.message.clone(),
                });
            }
            report.results.push(outcome);
        }

        info!(
            target: "vaultdrive::sync",
            "pass finished: {} uploaded, {} failed, {} bytes",
            report.uploaded_files,
            report.failed_uploads,
            report.total_bytes_uploaded
        );

        Ok(report)
    }
}

async fn upload_one(
    store: Arc<dyn CloudStore>,
    vault: Arc<dyn Vault>,
    folder_id: String,
    file: LocalFile,
) -> UploadOutcome {
    let content = match vault.read_content(&file.path) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                target: "vaultdrive::sync",
                "skipping {}: {}", file.name, err
            );
            return UploadOutcome {
                name: file.name,
                uploaded: false,
                file_size: None,
                message: err.user_message(),
            };
        }
    };

    let mime_type = mime_type_for(&file.name);
    let size = content.len() as u64;

    match store
        .create_file(&folder_id, &file.name, &mime_type, content)
        .await
    {
        Ok(remote) => UploadOutcome {
            name: file.name,
            uploaded: true,
            file_size: Some(size),
            message: format!("uploaded as {} (ID: {})", mime_type, remote.id),
        },
        Err(err) => {
            warn!(
                target: "vaultdrive::sync",
                "upload of {} failed: {}", file.name, err
            );
            UploadOutcome {
                name: file.name,
                uploaded: false,
                file_size: None,
                message: err.user_message(),
            }
        }
    }
}
