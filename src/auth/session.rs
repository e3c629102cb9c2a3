use crate::auth::oauth::OAuthClient;
use crate::config::{Settings, SettingsStore};
use crate::error::{errors, VaultDriveError, VaultResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Access tokens within this many seconds of expiry are refreshed before
/// use instead of being handed out.
const REFRESH_LEEWAY_SECS: i64 = 60;

/// High level authentication state exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthState {
    /// No usable tokens and no authorization in flight.
    Unauthenticated,
    /// An authorization URL has been issued and the user has not yet
    /// supplied the code Google gave them.
    PendingAuthorization { authorization_url: String },
    /// Authorization succeeded and we have usable tokens.
    Authenticated { expires_at: Option<DateTime<Utc>> },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    /// One-line summary for status output.
    pub fn describe(&self) -> String {
        match self {
            AuthState::Unauthenticated => "not authenticated".to_string(),
            AuthState::PendingAuthorization { .. } => {
                "waiting for authorization code".to_string()
            }
            AuthState::Authenticated { expires_at } => match expires_at {
                Some(at) => format!("authenticated (access token valid until {})", at),
                None => "authenticated".to_string(),
            },
        }
    }
}

/// Mutable token-holding half of the session. Guarded by one mutex so a
/// refresh and a concurrent settings save can never interleave.
struct TokenKeeper {
    oauth: OAuthClient,
    store: SettingsStore,
    settings: Settings,
    /// Expiry of the cached access token. Not persisted, so the first call
    /// after a restart goes through a refresh.
    expires_at: Option<DateTime<Utc>>,
}

impl TokenKeeper {
    fn cached_token_usable(&self) -> bool {
        if self.settings.access_token.is_none() {
            return false;
        }
        match self.expires_at {
            Some(at) => Utc::now() + Duration::seconds(REFRESH_LEEWAY_SECS) < at,
            None => false,
        }
    }
}

struct AuthSessionInner {
    keeper: Mutex<TokenKeeper>,
    state: RwLock<AuthState>,
}

/// Tracks the authorization lifecycle and hands out live access tokens.
///
/// Cloning is cheap; all clones share the same state, so every remote call
/// in the process sees one token cache and refreshes are serialized.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthSessionInner>,
}

impl AuthSession {
    /// Create a session from loaded settings. Pre-existing tokens mark the
    /// session authenticated straight away.
    pub fn new(settings: Settings, store: SettingsStore) -> Self {
        let oauth = OAuthClient::from_settings(&settings);
        Self::with_oauth_client(settings, store, oauth)
    }

    /// Create a session with an explicit OAuth client, used by tests to
    /// point token requests at a mock server.
    pub fn with_oauth_client(settings: Settings, store: SettingsStore, oauth: OAuthClient) -> Self {
        let initial_state = if settings.is_authenticated() {
            AuthState::Authenticated { expires_at: None }
        } else {
            AuthState::Unauthenticated
        };

        Self {
            inner: Arc::new(AuthSessionInner {
                keeper: Mutex::new(TokenKeeper {
                    oauth,
                    store,
                    settings,
                    expires_at: None,
                }),
                state: RwLock::new(initial_state),
            }),
        }
    }

    /// Get the current state snapshot.
    pub async fn state(&self) -> AuthState {
        self.inner.state.read().await.clone()
    }

    /// A copy of the settings backing this session.
    pub async fn settings(&self) -> Settings {
        self.inner.keeper.lock().await.settings.clone()
    }

    /// Start the authorization-code flow.
    ///
    /// Fails with a configuration error when client credentials are missing,
    /// leaving the state untouched. On success the returned consent URL is
    /// also recorded in the `PendingAuthorization` state.
    pub async fn begin_authorization(&self) -> VaultResult<String> {
        let keeper = self.inner.keeper.lock().await;
        let url = keeper.oauth.build_authorization_url()?;
        drop(keeper);

        let mut state = self.inner.state.write().await;
        *state = AuthState::PendingAuthorization {
            authorization_url: url.clone(),
        };

        info!(target: "vaultdrive::auth", "authorization started, waiting for code");
        Ok(url)
    }

    /// Exchange the code the user pasted for tokens and persist them.
    ///
    /// A failed exchange reverts to `Unauthenticated` with both tokens
    /// cleared.
    pub async fn complete_authorization(&self, code: &str) -> VaultResult<()> {
        let mut keeper = self.inner.keeper.lock().await;

        let exchange = keeper.oauth.exchange_code(code).await.and_then(|set| {
            let refresh = set.refresh_token.clone().ok_or_else(|| {
                errors::auth_error(
                    "Token reply did not include a refresh token; remove the app's access in your Google account and authorize again",
                )
            })?;
            Ok((set, refresh))
        });

        match exchange {
            Ok((set, refresh_token)) => {
                keeper.settings.authorization_code = code.to_string();
                keeper
                    .settings
                    .set_tokens(set.access_token.clone(), refresh_token);
                keeper.expires_at = set.expires_at;
                keeper.store.save(&keeper.settings)?;

                let mut state = self.inner.state.write().await;
                *state = AuthState::Authenticated {
                    expires_at: set.expires_at,
                };

                info!(target: "vaultdrive::auth", "authorization completed");
                Ok(())
            }
            Err(err) => {
                keeper.settings.clear_tokens();
                if let Err(save_err) = keeper.store.save(&keeper.settings) {
                    warn!(
                        target: "vaultdrive::auth",
                        "failed to persist cleared tokens: {}", save_err
                    );
                }
                keeper.expires_at = None;

                let mut state = self.inner.state.write().await;
                *state = AuthState::Unauthenticated;

                Err(err)
            }
        }
    }

    /// Get a live access token, refreshing first when the cached one is
    /// missing or near expiry. Refreshes are serialized behind the keeper
    /// mutex so concurrent callers wait instead of racing.
    pub async fn access_token(&self) -> VaultResult<String> {
        let mut keeper = self.inner.keeper.lock().await;

        if keeper.cached_token_usable() {
            if let Some(token) = keeper.settings.access_token.clone() {
                return Ok(token);
            }
        }

        let refresh_token = keeper
            .settings
            .refresh_token
            .clone()
            .ok_or_else(|| errors::auth_error("Not authenticated. Run the login flow first."))?;

        debug!(target: "vaultdrive::auth", "cached access token missing or stale, refreshing");

        match keeper.oauth.refresh_access_token(&refresh_token).await {
            Ok(set) => {
                let refresh = set
                    .refresh_token
                    .clone()
                    .unwrap_or_else(|| refresh_token.clone());
                keeper.settings.set_tokens(set.access_token.clone(), refresh);
                keeper.expires_at = set.expires_at;
                keeper.store.save(&keeper.settings)?;

                let mut state = self.inner.state.write().await;
                *state = AuthState::Authenticated {
                    expires_at: set.expires_at,
                };

                Ok(set.access_token)
            }
            Err(err) => {
                // A rejected refresh grant means the stored tokens are dead;
                // a transport failure does not.
                if matches!(err, VaultDriveError::Auth { .. }) {
                    keeper.settings.clear_tokens();
                    keeper.expires_at = None;
                    if let Err(save_err) = keeper.store.save(&keeper.settings) {
                        warn!(
                            target: "vaultdrive::auth",
                            "failed to persist cleared tokens: {}", save_err
                        );
                    }

                    let mut state = self.inner.state.write().await;
                    *state = AuthState::Unauthenticated;
                }
                Err(err)
            }
        }
    }
}
