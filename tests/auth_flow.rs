//! End-to-end authorization flow against a mock token endpoint.

use serde_json::json;
use tempfile::TempDir;
use vaultdrive::auth::{AuthSession, AuthState, OAuthClient};
use vaultdrive::config::{Settings, SettingsStore};
use vaultdrive::error::VaultDriveError;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_with_credentials() -> Settings {
    let mut settings = Settings::default();
    settings.client_id = "test-client-id".to_string();
    settings.client_secret = "test-secret".to_string();
    settings
}

fn session_against(server: &MockServer, temp: &TempDir, settings: Settings) -> AuthSession {
    let store = SettingsStore::with_path(temp.path().join("settings.json"));
    let oauth = OAuthClient::from_settings(&settings)
        .with_token_url(format!("{}/token", server.uri()));
    AuthSession::with_oauth_client(settings, store, oauth)
}

fn persisted_settings(temp: &TempDir) -> Settings {
    SettingsStore::with_path(temp.path().join("settings.json"))
        .load()
        .unwrap()
}

#[tokio::test]
async fn code_exchange_persists_tokens_and_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("client_id=test-client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a-1",
            "refresh_token": "r-1",
            "expires_in": 3600,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let session = session_against(&server, &temp, settings_with_credentials());

    let url = session.begin_authorization().await.unwrap();
    assert!(url.starts_with("https://accounts.google.com/"));
    assert!(matches!(
        session.state().await,
        AuthState::PendingAuthorization { .. }
    ));

    session.complete_authorization("the-code").await.unwrap();
    assert!(session.state().await.is_authenticated());

    let saved = persisted_settings(&temp);
    assert_eq!(saved.access_token.as_deref(), Some("a-1"));
    assert_eq!(saved.refresh_token.as_deref(), Some("r-1"));
    assert_eq!(saved.authorization_code, "the-code");
}

#[tokio::test]
async fn failed_exchange_reverts_to_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let session = session_against(&server, &temp, settings_with_credentials());

    session.begin_authorization().await.unwrap();
    let err = session.complete_authorization("expired-code").await.unwrap_err();
    assert!(matches!(err, VaultDriveError::Auth { .. }));

    assert_eq!(session.state().await, AuthState::Unauthenticated);
    let saved = persisted_settings(&temp);
    assert!(saved.access_token.is_none());
    assert!(saved.refresh_token.is_none());
}

#[tokio::test]
async fn exchange_reply_without_refresh_token_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a-1",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let session = session_against(&server, &temp, settings_with_credentials());

    session.begin_authorization().await.unwrap();
    let err = session.complete_authorization("the-code").await.unwrap_err();
    assert!(err.to_string().contains("refresh token"));
    assert_eq!(session.state().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn refresh_keeps_stored_refresh_token_when_reply_omits_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_credentials();
    settings.set_tokens("stale-access".to_string(), "stored-refresh".to_string());
    let session = session_against(&server, &temp, settings);

    let token = session.access_token().await.unwrap();
    assert_eq!(token, "fresh");

    let saved = persisted_settings(&temp);
    assert_eq!(saved.access_token.as_deref(), Some("fresh"));
    assert_eq!(saved.refresh_token.as_deref(), Some("stored-refresh"));
}

#[tokio::test]
async fn fresh_token_is_cached_until_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_credentials();
    settings.set_tokens("stale-access".to_string(), "stored-refresh".to_string());
    let session = session_against(&server, &temp, settings);

    assert_eq!(session.access_token().await.unwrap(), "fresh");
    // Second call must reuse the cached token; the mock allows one hit.
    assert_eq!(session.access_token().await.unwrap(), "fresh");
}

#[tokio::test]
async fn rejected_refresh_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_credentials();
    settings.set_tokens("stale-access".to_string(), "revoked-refresh".to_string());
    let session = session_against(&server, &temp, settings);

    let err = session.access_token().await.unwrap_err();
    assert!(matches!(err, VaultDriveError::Auth { .. }));
    assert_eq!(session.state().await, AuthState::Unauthenticated);

    let saved = persisted_settings(&temp);
    assert!(saved.access_token.is_none());
    assert!(saved.refresh_token.is_none());
}
