// ── Single-flight session refresh ──
//
// At most one refresh call is outstanding at any time; every caller that
// hits an expired session while it runs awaits the same shared future and
// observes the same outcome. A definitive rejection from the refresh
// endpoint disables further attempts until the next login re-arms the
// coordinator.

use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthUser;
use crate::error::{normalize_response, ApiError};

type RefreshFuture = Shared<BoxFuture<'static, Result<AuthUser, ApiError>>>;

/// Hook invoked exactly once when the session becomes unrecoverable.
///
/// Production wiring installs the login-redirect side effect here; tests
/// install counters. Implementations must be cheap and non-blocking --
/// they run on the task that settles the refresh future.
pub trait SessionSink: Send + Sync {
    fn on_session_expired(&self);
}

#[derive(Default)]
struct CoordinatorState {
    in_flight: Option<RefreshFuture>,
    /// Set after the refresh endpoint itself rejected the session.
    /// Further refresh attempts fail fast until `reset()`.
    disabled: bool,
}

/// Coordinates session refresh calls with single-flight semantics.
///
/// One instance is created per [`ApiClient`](crate::ApiClient) at wiring
/// time and shared behind an `Arc`. The two-field state is only ever
/// touched with the lock held and never across an `.await`, so the
/// "is something in flight?" check and the assignment that starts a new
/// flight are atomic.
pub struct SessionRefreshCoordinator {
    http: reqwest::Client,
    refresh_url: Url,
    state: Mutex<CoordinatorState>,
    sink: Mutex<Option<Arc<dyn SessionSink>>>,
}

impl SessionRefreshCoordinator {
    pub fn new(http: reqwest::Client, refresh_url: Url) -> Self {
        Self {
            http,
            refresh_url,
            state: Mutex::new(CoordinatorState::default()),
            sink: Mutex::new(None),
        }
    }

    /// Install the session-expiry hook. Replaces any previous sink.
    pub fn set_sink(&self, sink: Arc<dyn SessionSink>) {
        *self.sink.lock().expect("sink lock poisoned") = Some(sink);
    }

    /// Whether refresh attempts are currently disabled.
    pub fn is_disabled(&self) -> bool {
        self.state.lock().expect("state lock poisoned").disabled
    }

    /// Re-arm the coordinator. Called when a login attempt begins and on
    /// logout, so future sessions can refresh normally.
    pub fn reset(&self) {
        self.state.lock().expect("state lock poisoned").disabled = false;
    }

    /// Refresh the session, sharing the result with every concurrent caller.
    ///
    /// Rejects immediately with a 401 when disabled -- no network call is
    /// made for a session the server has already revoked.
    pub async fn refresh(self: &Arc<Self>) -> Result<AuthUser, ApiError> {
        let flight = {
            let mut state = self.state.lock().expect("state lock poisoned");
            if state.disabled {
                debug!("refresh disabled, rejecting without a network call");
                return Err(ApiError::unauthorized());
            }
            if let Some(flight) = &state.in_flight {
                debug!("joining in-flight session refresh");
                flight.clone()
            } else {
                debug!("starting session refresh");
                let this = Arc::clone(self);
                let flight: RefreshFuture = async move {
                    let result = this.issue().await;
                    this.settle(&result);
                    result
                }
                .boxed()
                .shared();
                state.in_flight = Some(flight.clone());
                flight
            }
        };

        flight.await
    }

    /// The one network call this type may make.
    async fn issue(&self) -> Result<AuthUser, ApiError> {
        let resp = self
            .http
            .post(self.refresh_url.clone())
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        if !resp.status().is_success() {
            return Err(normalize_response(resp).await);
        }

        resp.json::<AuthUser>()
            .await
            .map_err(|e| ApiError::new(format!("invalid refresh response: {e}")))
    }

    /// Bookkeeping after the flight settles: clear it so a future 401 can
    /// start a fresh attempt, and on a definitive rejection (400/401 from
    /// the refresh endpoint) disable further attempts and fire the expiry
    /// hook once.
    fn settle(&self, result: &Result<AuthUser, ApiError>) {
        let newly_disabled = {
            let mut state = self.state.lock().expect("state lock poisoned");
            state.in_flight = None;
            match result {
                Err(e) if matches!(e.status, Some(400) | Some(401)) && !state.disabled => {
                    state.disabled = true;
                    true
                }
                _ => false,
            }
        };

        match result {
            Ok(user) => debug!(user = %user.username, "session refresh succeeded"),
            Err(e) => warn!(error = %e, "session refresh failed"),
        }

        if newly_disabled {
            let sink = self.sink.lock().expect("sink lock poisoned").clone();
            if let Some(sink) = sink {
                sink.on_session_expired();
            }
        }
    }
}
