// ── Refresh-and-retry decision logic ──
//
// Pure classification of a failed request: should the client refresh the
// session and retry, or hand the error back? No I/O happens here -- the
// adapter in `client.rs` performs the actual refresh and re-dispatch,
// which keeps every branch testable without a network layer.

use crate::error::ApiError;

/// Paths that must never trigger a session refresh on 401.
///
/// Refreshing in response to a failed login would be nonsensical, and a
/// 401 from the refresh endpoint itself must not recurse. Matched as a
/// literal substring of the request path.
pub const AUTH_EXEMPT_PATHS: &[&str] = &[
    "/api/auth/login",
    "/api/auth/refresh",
    "/api/auth/register",
    "/api/auth/logout",
];

/// What the client should do with a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// Refresh the session, then re-issue the original request once.
    RefreshAndRetry,
    /// Hand the normalized error back to the caller unchanged.
    Propagate,
}

/// Per-request context the decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Request path (no scheme/host), e.g. `/api/notes`.
    pub path: &'a str,
    /// This request already went through one refresh-and-retry cycle.
    pub retried: bool,
    /// Caller opted out of refresh/redirect (background probes).
    pub skip_auth_redirect: bool,
}

/// Decide how to handle a failed request.
///
/// Evaluated in order: transport failures and non-401 statuses propagate;
/// a request that was already retried once propagates; auth endpoints and
/// explicit opt-outs propagate; everything else earns a single
/// refresh-and-retry.
pub fn decide(failure: &ApiError, ctx: &RequestContext<'_>) -> AuthAction {
    if failure.status != Some(401) {
        return AuthAction::Propagate;
    }
    if ctx.retried {
        return AuthAction::Propagate;
    }
    if AUTH_EXEMPT_PATHS.iter().any(|p| ctx.path.contains(p)) {
        return AuthAction::Propagate;
    }
    if ctx.skip_auth_redirect {
        return AuthAction::Propagate;
    }
    AuthAction::RefreshAndRetry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &str) -> RequestContext<'_> {
        RequestContext {
            path,
            retried: false,
            skip_auth_redirect: false,
        }
    }

    fn unauthorized() -> ApiError {
        ApiError::unauthorized()
    }

    #[test]
    fn fresh_401_on_protected_path_retries() {
        assert_eq!(
            decide(&unauthorized(), &ctx("/api/notes")),
            AuthAction::RefreshAndRetry
        );
    }

    #[test]
    fn transport_failure_propagates() {
        let failure = ApiError::new("connection refused");
        assert_eq!(decide(&failure, &ctx("/api/notes")), AuthAction::Propagate);
    }

    #[test]
    fn non_401_status_propagates() {
        let failure = ApiError::from_response(500, None);
        assert_eq!(decide(&failure, &ctx("/api/notes")), AuthAction::Propagate);
        let failure = ApiError::from_response(403, None);
        assert_eq!(decide(&failure, &ctx("/api/notes")), AuthAction::Propagate);
    }

    #[test]
    fn already_retried_never_retries_again() {
        let mut c = ctx("/api/notes");
        c.retried = true;
        assert_eq!(decide(&unauthorized(), &c), AuthAction::Propagate);
    }

    #[test]
    fn auth_endpoints_are_exempt() {
        for path in AUTH_EXEMPT_PATHS {
            assert_eq!(
                decide(&unauthorized(), &ctx(path)),
                AuthAction::Propagate,
                "{path} should never trigger a refresh"
            );
        }
    }

    #[test]
    fn exemption_matches_substrings() {
        assert_eq!(
            decide(&unauthorized(), &ctx("/api/auth/login?remember=true")),
            AuthAction::Propagate
        );
    }

    #[test]
    fn skip_auth_redirect_propagates() {
        let mut c = ctx("/api/notes");
        c.skip_auth_redirect = true;
        assert_eq!(decide(&unauthorized(), &c), AuthAction::Propagate);
    }
}
