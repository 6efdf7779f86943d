// scrawl-core: Session state machine and route guarding for Scrawl clients.

pub mod env;
pub mod guard;
pub mod redirect;
pub mod routes;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use env::{DiskEnvironment, Environment, Location, MemoryEnvironment};
pub use guard::{evaluate, RouteDecision, RouteGuard};
pub use redirect::{install_login_redirect, LoginRedirector};
pub use routes::{is_public_route, login_redirect_url, strip_locale_prefix};
pub use session::{AuthState, AuthStatus, AuthStore};
