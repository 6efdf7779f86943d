// scrawl-api: Async HTTP client for the Scrawl notes server.

pub mod auth;
pub mod client;
pub mod error;
pub mod interceptor;
pub mod notes;
pub mod refresh;
pub mod transport;

pub use auth::{AuthUser, Credentials, Registration};
pub use client::{ApiClient, ClientConfig, RequestOptions};
pub use error::{ApiError, ErrorCategory};
pub use notes::{Note, NoteDraft, Revision, SharedLink};
pub use refresh::{SessionRefreshCoordinator, SessionSink};
pub use transport::TransportConfig;
