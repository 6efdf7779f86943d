// ── Login-redirect side effect ──
//
// Fired by the refresh coordinator when the session becomes
// unrecoverable: clear the session (live auth state and persisted
// user), preserve the attempted destination in the login URL, and
// navigate after a short delay so the shell can play its exit
// transition. The target computation is pure; only the final
// navigation touches the environment.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;

use scrawl_api::SessionSink;

use crate::env::{Environment, Location};
use crate::routes::{locale_prefix, login_redirect_url, matches_prefix, strip_locale_prefix};
use crate::session::AuthStore;

/// Delay before navigating, long enough for the shell's exit transition.
pub const REDIRECT_TRANSITION_DELAY: Duration = Duration::from_millis(130);

/// The login URL to send an expired session to, or `None` when the user
/// is already on the login or registration page (avoid a redirect loop).
pub fn redirect_target(location: &Location, locales: &[String]) -> Option<String> {
    let stripped = strip_locale_prefix(&location.path, locales);
    if matches_prefix(stripped, "/login") || matches_prefix(stripped, "/register") {
        return None;
    }
    let locale = locale_prefix(&location.path, locales);
    Some(login_redirect_url(locale, &location.full()))
}

/// [`SessionSink`] implementation that performs the redirect.
pub struct LoginRedirector {
    env: Arc<dyn Environment>,
    store: Weak<AuthStore>,
    locales: Vec<String>,
    delay: Duration,
}

impl LoginRedirector {
    pub fn new(env: Arc<dyn Environment>, locales: Vec<String>) -> Self {
        Self {
            env,
            store: Weak::new(),
            locales,
            delay: REDIRECT_TRANSITION_DELAY,
        }
    }

    /// Also clear the live auth state when the session expires. A `Weak`
    /// handle: the sink lives inside the API client the store owns.
    pub fn with_store(mut self, store: &Arc<AuthStore>) -> Self {
        self.store = Arc::downgrade(store);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl SessionSink for LoginRedirector {
    fn on_session_expired(&self) {
        // The session is gone either way: drop it from the live state and
        // from storage before deciding whether to navigate.
        if let Some(store) = self.store.upgrade() {
            store.clear_user();
        } else {
            self.env.clear_user();
        }

        let location = self.env.location();
        let Some(target) = redirect_target(&location, &self.locales) else {
            debug!("session expired on an auth page, staying put");
            return;
        };

        debug!(%target, "session expired, redirecting to login");

        let env = Arc::clone(&self.env);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            env.navigate(&target);
        });
    }
}

/// Wire the redirect side effect into the store's API client. Call once
/// at application assembly time.
pub fn install_login_redirect(
    store: &Arc<AuthStore>,
    env: Arc<dyn Environment>,
    locales: Vec<String>,
) {
    let sink = LoginRedirector::new(env, locales).with_store(store);
    store.api().set_session_sink(Arc::new(sink));
}
