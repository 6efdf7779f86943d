// Session authentication endpoints
//
// Cookie-based login/logout plus the verify and refresh calls. The login
// endpoint sets the session cookie in the client's jar; subsequent
// requests use it automatically. The session itself is opaque to this
// layer -- we only know when to ask for a refresh and whether it worked.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const ME_PATH: &str = "/api/auth/me";
pub const CHANGE_PASSWORD_PATH: &str = "/api/auth/change-password";

/// The authenticated account as the server reports it.
///
/// Persisted client-side so the shell can render optimistically before
/// the session is re-verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub authorities: Vec<String>,
}

/// Login credentials. The password never appears in Debug output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub remember_me: bool,
}

/// Payload for a self-service registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl ApiClient {
    /// Establish a session with username/password.
    ///
    /// A fresh login attempt re-arms the refresh coordinator, so a
    /// previously revoked session doesn't poison the new one.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthUser, ApiError> {
        self.refresh_coordinator().reset();
        debug!(user = %credentials.username, "logging in");

        let body = json!({
            "username": credentials.username,
            "password": credentials.password.expose_secret(),
            "rememberMe": credentials.remember_me,
        });
        self.post_json(LOGIN_PATH, &body, RequestOptions::default())
            .await
    }

    /// Fetch the account behind the current session cookie.
    ///
    /// A 401 here goes through the normal refresh-and-retry cycle, so a
    /// verify right after the session expired still succeeds silently.
    pub async fn current_user(&self) -> Result<AuthUser, ApiError> {
        self.get_json(ME_PATH, RequestOptions::default()).await
    }

    /// Like [`current_user`](Self::current_user), but never refreshes or
    /// redirects -- for background probes that must fail silently.
    pub async fn probe_session(&self) -> Result<AuthUser, ApiError> {
        self.get_json(ME_PATH, RequestOptions::background()).await
    }

    /// End the session server-side and re-arm the refresh coordinator.
    ///
    /// Callers treat failure as non-fatal: client-side session clearing
    /// must proceed regardless.
    pub async fn logout(&self) -> Result<(), ApiError> {
        debug!("logging out");
        let result = self
            .post_unit(LOGOUT_PATH, None::<&()>, RequestOptions::default())
            .await;
        self.refresh_coordinator().reset();
        result
    }

    /// Register a new account. Does not establish a session.
    pub async fn register(&self, registration: &Registration) -> Result<AuthUser, ApiError> {
        self.post_json(REGISTER_PATH, registration, RequestOptions::default())
            .await
    }

    /// Change the account password. The server invalidates all sessions;
    /// callers should clear local state and force reauthentication.
    pub async fn change_password(
        &self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), ApiError> {
        let body = json!({
            "currentPassword": current_password.expose_secret(),
            "newPassword": new_password.expose_secret(),
        });
        self.post_unit(CHANGE_PASSWORD_PATH, Some(&body), RequestOptions::default())
            .await
    }
}
