// ── Route guard ──
//
// Decides, for the current location and auth state, whether the shell
// renders protected content, redirects to login, or verifies the session
// first. Stale persisted users are never trusted for protected content
// without a live confirmation, and a session confirmed once is not
// re-verified on every navigation.

use std::sync::Arc;

use crate::env::Location;
use crate::routes::{is_public_route, locale_prefix, login_redirect_url, strip_locale_prefix};
use crate::session::{AuthState, AuthStatus, AuthStore};

/// What the shell should do for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Render the requested content.
    Render,
    /// Navigate to this login URL instead.
    Redirect(String),
    /// Dispatch a session verification (unless one is loading) and show a
    /// loading state until it settles.
    Verify,
}

/// Classify a navigation against the current auth state.
pub fn evaluate(state: &AuthState, location: &Location, locales: &[String]) -> RouteDecision {
    let stripped = strip_locale_prefix(&location.path, locales);
    if is_public_route(stripped) {
        return RouteDecision::Render;
    }

    if state.user.is_none() {
        let locale = locale_prefix(&location.path, locales);
        return RouteDecision::Redirect(login_redirect_url(locale, &location.full()));
    }

    if !state.session_checked {
        return RouteDecision::Verify;
    }

    RouteDecision::Render
}

/// Bundles the auth store with the configured locales and drives
/// [`RouteDecision::Verify`] to a terminal decision.
pub struct RouteGuard {
    store: Arc<AuthStore>,
    locales: Vec<String>,
}

impl RouteGuard {
    pub fn new(store: Arc<AuthStore>, locales: Vec<String>) -> Self {
        Self { store, locales }
    }

    /// The synchronous decision for a location.
    pub fn decide(&self, location: &Location) -> RouteDecision {
        evaluate(&self.store.state(), location, &self.locales)
    }

    /// Resolve a navigation to `Render` or `Redirect`, running the
    /// session verification when one is required.
    pub async fn resolve(&self, location: &Location) -> RouteDecision {
        loop {
            match self.decide(location) {
                RouteDecision::Verify => {
                    if self.store.state().status != AuthStatus::Loading {
                        self.store.verify_session().await;
                    } else {
                        // Another dispatch is in flight; wait for it to
                        // settle rather than stacking a second call.
                        let mut rx = self.store.subscribe();
                        while rx.borrow().status == AuthStatus::Loading {
                            if rx.changed().await.is_err() {
                                break;
                            }
                        }
                    }
                }
                decision => return decision,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_api::AuthUser;

    fn locales() -> Vec<String> {
        vec!["en".into()]
    }

    fn user() -> AuthUser {
        AuthUser {
            username: "alice".into(),
            email: None,
            authorities: vec!["ROLE_USER".into()],
        }
    }

    fn state(user: Option<AuthUser>, session_checked: bool) -> AuthState {
        AuthState {
            user,
            status: AuthStatus::Idle,
            session_checked,
            error: None,
        }
    }

    #[test]
    fn public_routes_always_render() {
        let anonymous = state(None, false);
        for path in ["/login", "/en/login", "/share/abc123", "/404", "/403"] {
            assert_eq!(
                evaluate(&anonymous, &Location::new(path), &locales()),
                RouteDecision::Render,
                "{path} should render without a session"
            );
        }
    }

    #[test]
    fn anonymous_protected_navigation_redirects_with_target() {
        let decision = evaluate(
            &state(None, true),
            &Location::new("/shared-links").with_query("page=2"),
            &locales(),
        );
        assert_eq!(
            decision,
            RouteDecision::Redirect("/login?redirect=%2Fshared-links%3Fpage%3D2".into())
        );
    }

    #[test]
    fn locale_prefixed_navigation_redirects_into_the_same_locale() {
        let decision = evaluate(
            &state(None, true),
            &Location::new("/en/shared-links").with_query("page=2"),
            &locales(),
        );
        assert_eq!(
            decision,
            RouteDecision::Redirect("/en/login?redirect=%2Fen%2Fshared-links%3Fpage%3D2".into())
        );
    }

    #[test]
    fn unverified_stored_user_triggers_verification() {
        let decision = evaluate(&state(Some(user()), false), &Location::new("/"), &locales());
        assert_eq!(decision, RouteDecision::Verify);
    }

    #[test]
    fn verified_user_renders() {
        let decision = evaluate(&state(Some(user()), true), &Location::new("/"), &locales());
        assert_eq!(decision, RouteDecision::Render);
    }
}
