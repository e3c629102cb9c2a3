//! Drive client wire behavior against a mock HTTP server.

use serde_json::json;
use tempfile::TempDir;
use vaultdrive::auth::{AuthSession, OAuthClient};
use vaultdrive::config::{Settings, SettingsStore};
use vaultdrive::error::VaultDriveError;
use vaultdrive::remote::drive::DriveClient;
use vaultdrive::remote::CloudStore;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client whose auth session and Drive calls both talk to `server`.
///
/// The token endpoint always serves a fresh access token so Drive calls
/// carry `Bearer fresh-token`.
async fn drive_client(server: &MockServer, temp: &TempDir) -> DriveClient {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;

    let mut settings = Settings::default();
    settings.client_id = "test-client-id".to_string();
    settings.client_secret = "test-secret".to_string();
    settings.set_tokens("stale-access".to_string(), "stored-refresh".to_string());

    let store = SettingsStore::with_path(temp.path().join("settings.json"));
    let oauth = OAuthClient::from_settings(&settings)
        .with_token_url(format!("{}/token", server.uri()));
    let session = AuthSession::with_oauth_client(settings, store, oauth);

    DriveClient::new(session).with_base_urls(server.uri(), server.uri())
}

#[tokio::test]
async fn list_files_queries_the_folder_and_follows_pagination() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let client = drive_client(&server, &temp).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", "'folder-1' in parents and trashed=false"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"id": "id-a", "name": "a.md", "size": "5", "mimeType": "text/markdown"},
            ],
            "nextPageToken": "page-2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"id": "id-b", "name": "b.png"},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let files = client.list_files("folder-1").await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "a.md");
    assert_eq!(files[0].size, Some(5));
    assert_eq!(files[1].name, "b.png");
    assert_eq!(files[1].id, "id-b");
}

#[tokio::test]
async fn create_file_uploads_metadata_and_content_as_multipart() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let client = drive_client(&server, &temp).await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-id",
            "name": "report.pdf",
            "mimeType": "application/pdf",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_file("folder-1", "report.pdf", "application/pdf", b"PDFDATA".to_vec())
        .await
        .unwrap();

    assert_eq!(created.id, "new-id");
    assert_eq!(created.name, "report.pdf");

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/files")
        .unwrap();
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains("\"parents\":[\"folder-1\"]"));
    assert!(body.contains("\"name\":\"report.pdf\""));
    assert!(body.contains("PDFDATA"));

    let auth_header = upload.headers.get("authorization").unwrap();
    assert_eq!(auth_header.to_str().unwrap(), "Bearer fresh-token");
}

#[tokio::test]
async fn delete_file_succeeds_on_no_content() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let client = drive_client(&server, &temp).await;

    Mock::given(method("DELETE"))
        .and(path("/files/live-id"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_file("live-id").await.unwrap();
}

#[tokio::test]
async fn delete_of_unknown_id_maps_to_not_found() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let client = drive_client(&server, &temp).await;

    Mock::given(method("DELETE"))
        .and(path("/files/ghost-id"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
        .mount(&server)
        .await;

    let err = client.delete_file("ghost-id").await.unwrap_err();
    assert!(matches!(err, VaultDriveError::NotFound { .. }));
}

#[tokio::test]
async fn rejected_access_token_maps_to_auth_error() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let client = drive_client(&server, &temp).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .mount(&server)
        .await;

    let err = client.list_files("folder-1").await.unwrap_err();
    assert!(matches!(err, VaultDriveError::Auth { .. }));
}

#[tokio::test]
async fn backend_errors_carry_the_status_code() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let client = drive_client(&server, &temp).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Backend Error"))
        .mount(&server)
        .await;

    let err = client.list_files("folder-1").await.unwrap_err();
    match err {
        VaultDriveError::RemoteApi { status, .. } => assert_eq!(status, 503),
        other => panic!("unexpected error: {:?}", other),
    }
}
