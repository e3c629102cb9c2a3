//! Local vault access: enumerating, reading and relocating the files the
//! sync layer works on.

pub mod mime;

use crate::error::{errors, VaultResult};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot of one local file taken at enumeration time. Content is read
/// separately, right before upload.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub extension: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Filesystem operations the sync layer needs from the vault. Tests
/// substitute in-memory implementations.
pub trait Vault: Send + Sync {
    /// Files directly inside `dir`. Subdirectories are not entered and not
    /// reported.
    fn list_children(&self, dir: &Path) -> VaultResult<Vec<LocalFile>>;

    /// Full content of one file.
    fn read_content(&self, path: &Path) -> VaultResult<Vec<u8>>;

    /// Move a file, creating the target's parent directory if needed.
    fn rename(&self, from: &Path, to: &Path) -> VaultResult<()>;
}

/// [`Vault`] backed by the real filesystem.
#[derive(Debug, Default, Clone)]
pub struct FsVault;

impl FsVault {
    pub fn new() -> Self {
        Self
    }
}

impl Vault for FsVault {
    fn list_children(&self, dir: &Path) -> VaultResult<Vec<LocalFile>> {
        let entries = fs::read_dir(dir).map_err(|e| {
            errors::local_io_error_with_source(
                format!("Failed to read directory: {}", e),
                dir.display().to_string(),
                e,
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                errors::local_io_error_with_source(
                    format!("Failed to read directory entry: {}", e),
                    dir.display().to_string(),
                    e,
                )
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
            let modified_time = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            files.push(LocalFile {
                path,
                name,
                extension,
                modified_time,
            });
        }

        // Stable order for plans and progress output.
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn read_content(&self, path: &Path) -> VaultResult<Vec<u8>> {
        fs::read(path).map_err(|e| {
            errors::local_io_error_with_source(
                format!("Failed to read file: {}", e),
                path.display().to_string(),
                e,
            )
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> VaultResult<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                errors::local_io_error_with_source(
                    format!("Failed to create target directory: {}", e),
                    parent.display().to_string(),
                    e,
                )
            })?;
        }

        fs::rename(from, to).map_err(|e| {
            errors::local_io_error_with_source(
                format!(
                    "Failed to move file to {}: {}",
                    to.display(),
                    e
                ),
                from.display().to_string(),
                e,
            )
        })
    }
}
