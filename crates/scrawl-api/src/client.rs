// Scrawl HTTP client
//
// Wraps `reqwest::Client` with base-URL construction, response
// normalization, and the refresh-and-retry adapter around the pure
// decision logic in `interceptor.rs`. Endpoint modules (auth, notes) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{normalize_response, ApiError};
use crate::interceptor::{decide, AuthAction, RequestContext};
use crate::refresh::{SessionRefreshCoordinator, SessionSink};
use crate::transport::TransportConfig;

/// Connection settings for a single Scrawl server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `https://notes.example.com`.
    pub base_url: Url,
    pub timeout: Duration,
    /// Accept self-signed certificates (self-hosted servers).
    pub accept_invalid_certs: bool,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

/// Per-request knobs consulted by the failure interceptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Opt out of refresh-and-retry entirely; the 401 is handed back and
    /// no redirect fires. For requests that must fail silently.
    pub skip_auth_redirect: bool,
    /// Set by the retry adapter after the first refresh-and-retry cycle.
    pub(crate) retried: bool,
}

impl RequestOptions {
    /// Options for background probes that must never disturb the session.
    pub fn background() -> Self {
        Self {
            skip_auth_redirect: true,
            retried: false,
        }
    }
}

/// HTTP client for the Scrawl server.
///
/// The session cookie lives in the client's jar and rides along on every
/// request. A 401 on a protected call triggers a single shared session
/// refresh and one transparent retry; see [`SessionRefreshCoordinator`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    refresh: Arc<SessionRefreshCoordinator>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            cookie_jar: None,
            accept_invalid_certs: config.accept_invalid_certs,
        }
        .with_cookie_jar();
        let http = transport.build_client()?;

        let refresh_url = join_url(&config.base_url, crate::auth::REFRESH_PATH)?;
        let refresh = Arc::new(SessionRefreshCoordinator::new(http.clone(), refresh_url));

        Ok(Self {
            http,
            base_url: config.base_url,
            refresh,
        })
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The refresh coordinator (for wiring and state inspection).
    pub fn refresh_coordinator(&self) -> &Arc<SessionRefreshCoordinator> {
        &self.refresh
    }

    /// Install the session-expiry hook on the coordinator.
    pub fn set_session_sink(&self, sink: Arc<dyn SessionSink>) {
        self.refresh.set_sink(sink);
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ApiError> {
        join_url(&self.base_url, path)
    }

    // ── Typed request helpers ────────────────────────────────────────

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("GET {url}");
        let resp = self.send(self.http.get(url), path, opts).await?;
        parse_json(resp).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        opts: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("POST {url}");
        let resp = self.send(self.http.post(url).json(body), path, opts).await?;
        parse_json(resp).await
    }

    pub(crate) async fn post_unit(
        &self,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
        opts: RequestOptions,
    ) -> Result<(), ApiError> {
        let url = self.url(path)?;
        debug!("POST {url}");
        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder, path, opts).await?;
        Ok(())
    }

    pub(crate) async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        opts: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("PUT {url}");
        let resp = self.send(self.http.put(url).json(body), path, opts).await?;
        parse_json(resp).await
    }

    pub(crate) async fn delete_unit(
        &self,
        path: &str,
        opts: RequestOptions,
    ) -> Result<(), ApiError> {
        let url = self.url(path)?;
        debug!("DELETE {url}");
        self.send(self.http.delete(url), path, opts).await?;
        Ok(())
    }

    // ── Refresh-and-retry adapter ────────────────────────────────────

    /// Dispatch a request, running every failure through the interceptor.
    ///
    /// On `RefreshAndRetry` the original request is re-issued once with
    /// the same configuration; the loop terminates because the retried
    /// flag forces `Propagate` on a second failure. A refresh failure
    /// propagates the refresh error, not the original 401 -- the redirect
    /// side effect fires inside the coordinator's disable transition.
    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
        mut opts: RequestOptions,
    ) -> Result<reqwest::Response, ApiError> {
        let mut attempt = builder;
        loop {
            // Clone before dispatch so a retry re-issues the identical
            // request. Streaming bodies can't be cloned; those propagate.
            let retry = attempt.try_clone();

            let failure = match attempt.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => normalize_response(resp).await,
                Err(e) => ApiError::from_transport(&e),
            };

            let ctx = RequestContext {
                path,
                retried: opts.retried,
                skip_auth_redirect: opts.skip_auth_redirect,
            };

            match decide(&failure, &ctx) {
                AuthAction::Propagate => return Err(failure),
                AuthAction::RefreshAndRetry => {
                    let Some(retry) = retry else {
                        return Err(failure);
                    };
                    opts.retried = true;
                    self.refresh.refresh().await?;
                    debug!("session refreshed, retrying {path}");
                    attempt = retry;
                }
            }
        }
    }
}

/// Join a path onto the server root.
fn join_url(base: &Url, path: &str) -> Result<Url, ApiError> {
    base.join(path)
        .map_err(|e| ApiError::new(format!("invalid URL path {path:?}: {e}")))
}

/// Deserialize a success response, keeping a body preview on failure.
async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let body = resp
        .bytes()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;
    serde_json::from_slice(&body).map_err(|e| {
        let preview = String::from_utf8_lossy(&body[..body.len().min(200)]);
        ApiError::new(format!("invalid response body: {e} (preview: {preview:?})"))
    })
}
