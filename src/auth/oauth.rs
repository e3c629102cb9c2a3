use crate::config::Settings;
use crate::error::{errors, VaultResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested during authorization. Listing and deleting stay within
/// the configured folder, so the file scope plus read-only metadata is
/// enough.
const DRIVE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/drive.metadata.readonly",
];

/// Token endpoint calls get their own timeout so a stalled authorization
/// never hangs a sync pass behind it.
const TOKEN_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// An issued token pair plus a local expiry estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    fn from_response(resp: TokenResponse) -> Self {
        let expires_at = resp
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs as i64));
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at,
        }
    }
}

/// OAuth client for the authorization-code flow against Google.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
    http_client: reqwest::Client,
    auth_url: String,
    token_url: String,
}

impl OAuthClient {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            scopes: DRIVE_SCOPES.iter().map(|s| s.to_string()).collect(),
            http_client: reqwest::Client::new(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Point the client at a different token endpoint.
    ///
    /// This method is primarily used in tests to direct token requests at a
    /// local mock server instead of Google.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Validate client configuration
    pub fn validate(&self) -> VaultResult<()> {
        if self.client_id.is_empty() {
            return Err(errors::config_error(
                "Client ID is required. Add your Google OAuth credentials to the settings file.",
            ));
        }

        if self.client_secret.is_empty() {
            return Err(errors::config_error(
                "Client secret is required. Add your Google OAuth credentials to the settings file.",
            ));
        }

        Ok(())
    }

    /// Build the Google OAuth2 authorization URL that the user should open.
    ///
    /// `access_type=offline` plus `prompt=consent` make Google hand back a
    /// refresh token on the following code exchange.
    pub fn build_authorization_url(&self) -> VaultResult<String> {
        self.validate()?;

        let scope = self.scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", &scope),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];

        let url = url::Url::parse_with_params(&self.auth_url, &params)
            .map_err(|e| errors::config_error(format!("Failed to build auth URL: {e}")))?;

        Ok(url.to_string())
    }

    /// Exchange an authorization code for access + refresh tokens.
    pub async fn exchange_code(&self, code: &str) -> VaultResult<TokenSet> {
        if code.is_empty() {
            return Err(errors::auth_error("Authorization code is empty"));
        }

        debug!("Exchanging authorization code for tokens");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            let token_response: TokenResponse = response.json().await?;
            Ok(TokenSet::from_response(token_response))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(errors::auth_error(format!(
                "Authorization code exchange failed: {}",
                error_text
            )))
        }
    }

    /// Refresh an expired access token using the refresh token.
    ///
    /// Google does not always return a new refresh token on refresh, so the
    /// one passed in is carried over when the reply omits it.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> VaultResult<TokenSet> {
        if refresh_token.is_empty() {
            return Err(errors::auth_error("No refresh token available"));
        }

        debug!("Refreshing OAuth access token");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            let token_response: TokenResponse = response.json().await?;
            let mut token_set = TokenSet::from_response(token_response);
            if token_set.refresh_token.is_none() {
                token_set.refresh_token = Some(refresh_token.to_string());
            }
            Ok(token_set)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(errors::auth_error(format!(
                "Token refresh failed: {}",
                error_text
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_credentials() -> Settings {
        let mut settings = Settings::default();
        settings.client_id = "test-client-id".to_string();
        settings.client_secret = "test-secret".to_string();
        settings
    }

    #[test]
    fn build_authorization_url_success() {
        let client = OAuthClient::from_settings(&settings_with_credentials());
        let url = client.build_authorization_url().unwrap();

        assert!(url.contains("accounts.google.com"));
        assert!(url.contains("test-client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn build_authorization_url_empty_client_id() {
        let mut settings = settings_with_credentials();
        settings.client_id = String::new();

        let client = OAuthClient::from_settings(&settings);
        let err = client.build_authorization_url().unwrap_err();
        assert!(err.to_string().contains("Client ID"));
    }

    #[test]
    fn build_authorization_url_empty_client_secret() {
        let mut settings = settings_with_credentials();
        settings.client_secret = String::new();

        let client = OAuthClient::from_settings(&settings);
        assert!(client.validate().is_err());
    }

    #[test]
    fn token_set_from_response_with_expiry() {
        let resp = TokenResponse {
            access_token: "ya29.test".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_in: Some(3600),
            token_type: Some("Bearer".to_string()),
            scope: None,
        };
        let set = TokenSet::from_response(resp);
        assert_eq!(set.access_token, "ya29.test");
        assert_eq!(set.refresh_token, Some("1//refresh".to_string()));
        assert!(set.expires_at.is_some());
    }

    #[test]
    fn token_set_from_response_without_expiry() {
        let resp = TokenResponse {
            access_token: "ya29.test".to_string(),
            refresh_token: None,
            expires_in: None,
            token_type: None,
            scope: None,
        };
        let set = TokenSet::from_response(resp);
        assert!(set.expires_at.is_none());
        assert!(set.refresh_token.is_none());
    }

    #[tokio::test]
    async fn exchange_rejects_empty_code() {
        let client = OAuthClient::from_settings(&settings_with_credentials());
        let err = client.exchange_code("").await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn refresh_rejects_missing_token() {
        let client = OAuthClient::from_settings(&settings_with_credentials());
        let err = client.refresh_access_token("").await.unwrap_err();
        assert!(err.to_string().contains("refresh token"));
    }
}
