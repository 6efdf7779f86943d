// ── Authentication state machine ──
//
// Observable session state for the shell: who is logged in, whether the
// session has been verified against the server this run, and what the
// last auth action produced. State changes are broadcast on a `watch`
// channel; the async actions call the API and settle into a new state.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, warn};

use scrawl_api::{ApiClient, ApiError, AuthUser, Credentials};

use crate::env::Environment;

/// Progress of the most recent authentication action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// The full observable authentication state.
///
/// Invariants: `Succeeded` implies `user` is present; after a logout the
/// state is `Idle` with no user. `session_checked` reports whether the
/// current `user` value has been confirmed by a live round trip (or a
/// completed login) this run -- a hydrated-from-disk user starts
/// unchecked.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub status: AuthStatus,
    pub session_checked: bool,
    pub error: Option<String>,
}

/// Holds the session state and the async actions that mutate it.
///
/// Overlapping dispatches are tolerated -- the last settlement wins. The
/// only load-bearing deduplication lives in the API layer's refresh
/// coordinator.
pub struct AuthStore {
    api: Arc<ApiClient>,
    env: Arc<dyn Environment>,
    state: watch::Sender<AuthState>,
}

impl AuthStore {
    /// Create the store, hydrating from the persisted user if present.
    ///
    /// A stored user is rendered optimistically but not trusted: the
    /// unchecked flag forces a live verification before any protected
    /// route renders.
    pub fn new(api: Arc<ApiClient>, env: Arc<dyn Environment>) -> Self {
        let user = env.load_user();
        let initial = AuthState {
            session_checked: user.is_none(),
            user,
            status: AuthStatus::Idle,
            error: None,
        };
        let (state, _) = watch::channel(initial);
        Self { api, env, state }
    }

    /// The API client this store acts through.
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn update(&self, mutate: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(mutate);
    }

    // ── Async actions ────────────────────────────────────────────────

    /// Log in. A login attempt counts as a session check in itself.
    pub async fn login_user(&self, credentials: &Credentials) -> Result<AuthUser, ApiError> {
        self.update(|s| {
            s.status = AuthStatus::Loading;
            s.session_checked = true;
            s.error = None;
        });

        match self.api.login(credentials).await {
            Ok(user) => {
                self.env.store_user(&user);
                self.update(|s| {
                    s.user = Some(user.clone());
                    s.status = AuthStatus::Succeeded;
                    s.error = None;
                });
                Ok(user)
            }
            Err(e) => {
                self.update(|s| {
                    s.status = AuthStatus::Failed;
                    s.error = Some(e.message.clone());
                });
                Err(e)
            }
        }
    }

    /// Confirm the current session with a live round trip.
    ///
    /// Failure is not an error state for the UI -- it simply means "not
    /// logged in": the user is cleared and the state returns to `Idle`.
    pub async fn verify_session(&self) -> Option<AuthUser> {
        self.update(|s| s.status = AuthStatus::Loading);

        match self.api.current_user().await {
            Ok(user) => {
                self.env.store_user(&user);
                self.update(|s| {
                    s.user = Some(user.clone());
                    s.status = AuthStatus::Succeeded;
                    s.session_checked = true;
                    s.error = None;
                });
                Some(user)
            }
            Err(e) => {
                debug!(error = %e, "session verification failed");
                self.env.clear_user();
                self.update(|s| {
                    s.user = None;
                    s.status = AuthStatus::Idle;
                    s.session_checked = true;
                    s.error = None;
                });
                None
            }
        }
    }

    /// Log out. Client state is cleared unconditionally; the server call
    /// is best-effort.
    pub async fn logout_user(&self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "server-side logout failed (non-fatal)");
        }
        self.clear_user();
    }

    /// Synchronously drop the session client-side. Same terminal state as
    /// a successful logout; no network round trip.
    pub fn clear_user(&self) {
        self.env.clear_user();
        self.update(|s| {
            s.user = None;
            s.status = AuthStatus::Idle;
            s.session_checked = true;
            s.error = None;
        });
    }

    /// Change the password, then force reauthentication.
    pub async fn change_password(
        &self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), ApiError> {
        self.api
            .change_password(current_password, new_password)
            .await?;
        self.clear_user();
        Ok(())
    }
}
