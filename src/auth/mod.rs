//! OAuth2 authorization for Google Drive access.

pub mod oauth;
pub mod session;

pub use oauth::{OAuthClient, TokenSet};
pub use session::{AuthSession, AuthState};
