//! Remote storage abstraction and the Google Drive implementation.

pub mod drive;

pub use drive::DriveClient;

use crate::error::VaultResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A file as the remote store reports it. The id is the store's identity;
/// the name is what local files are matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Remote folder operations the sync layer needs. Implemented by
/// [`DriveClient`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait CloudStore: Send + Sync {
    /// All non-trashed files directly inside `folder_id`.
    async fn list_files(&self, folder_id: &str) -> VaultResult<Vec<RemoteFile>>;

    /// Create a new file under `folder_id`. No existence check is made
    /// here; callers decide whether a name should be uploaded.
    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> VaultResult<RemoteFile>;

    /// Delete a file by id. Fails with `NotFound` when the id does not
    /// exist remotely.
    async fn delete_file(&self, file_id: &str) -> VaultResult<()>;
}
