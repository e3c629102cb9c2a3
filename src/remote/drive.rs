// Google Drive client over the plain HTTP API, authenticated through the
// shared auth session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::AuthSession;
use crate::error::{errors, VaultResult};
use crate::remote::{CloudStore, RemoteFile};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const FILE_FIELDS: &str = "id,name,size,mimeType,modifiedTime";

/// Google Drive API response structures
#[derive(Debug, Deserialize)]
struct DriveFileResponse {
    id: String,
    name: String,
    size: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "modifiedTime")]
    modified_time: Option<String>,
}

impl From<DriveFileResponse> for RemoteFile {
    fn from(response: DriveFileResponse) -> Self {
        Self {
            id: response.id,
            name: response.name,
            size: response.size.and_then(|s| s.parse().ok()),
            mime_type: response.mime_type,
            modified_time: response.modified_time.and_then(|dt| {
                DateTime::parse_from_rfc3339(&dt)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileListResponse {
    files: Option<Vec<DriveFileResponse>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Google Drive client. One `reqwest::Client` is shared across calls so
/// connections get reused; the access token is fetched fresh from the
/// session before every request.
pub struct DriveClient {
    session: AuthSession,
    http_client: reqwest::Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(session: AuthSession) -> Self {
        Self {
            session,
            http_client: reqwest::Client::new(),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }

    /// Point the client at different API hosts.
    ///
    /// This method is primarily used in tests to direct Drive requests at a
    /// local mock server instead of Google.
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
        self
    }

    async fn bearer_token(&self) -> VaultResult<String> {
        self.session.access_token().await
    }
}

#[async_trait]
impl CloudStore for DriveClient {
    async fn list_files(&self, folder_id: &str) -> VaultResult<Vec<RemoteFile>> {
        debug!("Listing files in folder: {}", folder_id);

        let query = format!("'{}' in parents and trashed=false", folder_id);
        let fields = format!("files({}),nextPageToken", FILE_FIELDS);

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let access_token = self.bearer_token().await?;

            let mut request = self
                .http_client
                .get(format!("{}/files", self.api_base))
                .header("Authorization", format!("Bearer {}", access_token))
                .query(&[
                    ("q", query.as_str()),
                    ("fields", fields.as_str()),
                    ("pageSize", "100"),
                ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let error_text = response.text().await.unwrap_or_default();
                if status == 401 {
                    return Err(errors::auth_error(format!(
                        "Drive rejected the access token: {}",
                        error_text
                    )));
                }
                return Err(errors::remote_api_error(status, error_text));
            }

            let list_response: DriveFileListResponse = response.json().await?;

            if let Some(file_list) = list_response.files {
                for file in file_list {
                    files.push(RemoteFile::from(file));
                }
            }

            page_token = list_response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!("Found {} files in folder {}", files.len(), folder_id);
        Ok(files)
    }

    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> VaultResult<RemoteFile> {
        info!("Uploading file: {}", name);

        let access_token = self.bearer_token().await?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": mime_type,
            "parents": [folder_id],
        });

        let metadata_part = Part::text(metadata.to_string())
            .file_name("metadata")
            .mime_str("application/json")
            .map_err(|e| errors::config_error(format!("Invalid metadata part: {}", e)))?;

        let file_part = Part::bytes(content)
            .file_name(name.to_string())
            .mime_str(mime_type)
            .map_err(|e| {
                errors::config_error(format!("Invalid MIME type '{}': {}", mime_type, e))
            })?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let upload_url = format!(
            "{}/files?uploadType=multipart&fields={}",
            self.upload_base, FILE_FIELDS
        );

        let response = self
            .http_client
            .post(&upload_url)
            .header("Authorization", format!("Bearer {}", access_token))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            if status == 401 {
                return Err(errors::auth_error(format!(
                    "Drive rejected the access token: {}",
                    error_text
                )));
            }
            return Err(errors::remote_api_error(status, error_text));
        }

        let file_response: DriveFileResponse = response.json().await?;
        let remote_file = RemoteFile::from(file_response);

        info!(
            "Successfully uploaded file: {} (ID: {})",
            remote_file.name, remote_file.id
        );
        Ok(remote_file)
    }

    async fn delete_file(&self, file_id: &str) -> VaultResult<()> {
        info!("Deleting file: {}", file_id);

        let access_token = self.bearer_token().await?;

        let response = self
            .http_client
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status {
                404 => errors::not_found(format!("file '{}'", file_id)),
                401 => errors::auth_error(format!(
                    "Drive rejected the access token: {}",
                    error_text
                )),
                _ => errors::remote_api_error(status, error_text),
            });
        }

        info!("Successfully deleted file: {}", file_id);
        Ok(())
    }
}
