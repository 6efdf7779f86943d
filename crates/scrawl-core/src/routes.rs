// ── Route classification and login-redirect URLs ──
//
// Pure path logic: locale-prefix stripping, public/protected
// classification, and construction of the locale-aware login URL that
// preserves the attempted destination.

/// Route prefixes that render without a session. Exact match or subpath.
pub const PUBLIC_ROUTE_PREFIXES: &[&str] = &["/login", "/register", "/share", "/403", "/404"];

/// True when `path` equals `prefix` or sits under it.
pub(crate) fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// The locale segment leading `path`, if any.
pub fn locale_prefix<'a>(path: &'a str, locales: &[String]) -> Option<&'a str> {
    let first = path.strip_prefix('/')?.split('/').next()?;
    locales.iter().any(|l| l == first).then_some(first)
}

/// Strip a leading `/<locale>` segment; the bare locale root maps to `/`.
///
/// Idempotent for paths that carry no locale prefix.
pub fn strip_locale_prefix<'a>(path: &'a str, locales: &[String]) -> &'a str {
    match locale_prefix(path, locales) {
        Some(locale) => {
            let rest = &path[1 + locale.len()..];
            if rest.is_empty() { "/" } else { rest }
        }
        None => path,
    }
}

/// Whether a locale-stripped path renders without authentication.
pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTE_PREFIXES
        .iter()
        .any(|prefix| matches_prefix(path, prefix))
}

/// Build the login URL that returns the user to `target` after login.
///
/// `target` is the full original path (+ query + hash) and is
/// percent-encoded into the `redirect` parameter.
pub fn login_redirect_url(locale: Option<&str>, target: &str) -> String {
    let prefix = locale.map(|l| format!("/{l}")).unwrap_or_default();
    format!("{prefix}/login?redirect={}", urlencoding::encode(target))
}
