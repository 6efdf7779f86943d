// ── Normalized API errors ──
//
// Every failure is flattened into `ApiError` before it crosses the client
// boundary. Callers never see a raw `reqwest::Error` or an unparsed
// response body -- UI code renders `message` and branches on `status`.

use serde_json::Value;
use thiserror::Error;

/// Fallback message when a failure carries nothing usable.
const FALLBACK_MESSAGE: &str = "Request failed";

/// The single normalized error shape for any failed request.
///
/// `message` is always present and human-readable. `status` is the HTTP
/// status when the failure came from a response (transport failures have
/// none). `title` is the machine-readable problem title when the backend
/// sent a structured problem body. `body` preserves the raw error body
/// verbatim for UI consumption.
///
/// `Clone` is required: the refresh coordinator hands the same settled
/// result to every concurrent caller.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub title: Option<String>,
    pub body: Option<Value>,
}

/// Coarse failure classification, derived from the normalized fields.
///
/// A refresh-endpoint failure is an `Authorization`-class error like any
/// other 401 -- the coordinator tracks it positionally, not by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-level failure, no response was received.
    Transport,
    /// 401 on a request that expected an authenticated session.
    Authorization,
    /// 4xx with a structured problem body unrelated to auth.
    Validation,
    /// Anything else.
    Unknown,
}

impl ApiError {
    /// An error with only a message (no status, no body).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            title: None,
            body: None,
        }
    }

    /// A bare 401, used by the coordinator when refreshing is disabled.
    pub fn unauthorized() -> Self {
        Self {
            message: "Unauthorized".into(),
            status: Some(401),
            title: None,
            body: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    pub fn category(&self) -> ErrorCategory {
        match self.status {
            None => ErrorCategory::Transport,
            Some(401) => ErrorCategory::Authorization,
            Some(s) if (400..500).contains(&s) && self.title.is_some() => {
                ErrorCategory::Validation
            }
            Some(_) => ErrorCategory::Unknown,
        }
    }

    /// Normalize a transport-level failure (no response, or a failure
    /// raised while reading one).
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let message = err.to_string();
        Self {
            message: if message.is_empty() {
                FALLBACK_MESSAGE.into()
            } else {
                message
            },
            status: err.status().map(|s| s.as_u16()),
            title: None,
            body: None,
        }
    }

    /// Normalize an HTTP error response.
    ///
    /// Message priority: a string `detail` in the body, then a string
    /// `title` (which also populates the `title` field), then a generic
    /// status-bearing message. The body is kept verbatim either way.
    pub fn from_response(status: u16, body: Option<Value>) -> Self {
        let detail = body
            .as_ref()
            .and_then(|b| b.get("detail"))
            .and_then(Value::as_str)
            .map(String::from);
        let title = body
            .as_ref()
            .and_then(|b| b.get("title"))
            .and_then(Value::as_str)
            .map(String::from);

        let (message, title) = match (detail, title) {
            (Some(detail), _) => (detail, None),
            (None, Some(title)) => (title.clone(), Some(title)),
            (None, None) => (FALLBACK_MESSAGE.into(), None),
        };

        Self {
            message,
            status: Some(status),
            title,
            body,
        }
    }
}

/// Consume an error response and normalize it.
///
/// Reads the body as JSON when possible; a non-JSON or empty body is
/// treated as absent.
pub(crate) async fn normalize_response(resp: reqwest::Response) -> ApiError {
    let status = resp.status().as_u16();
    let body = match resp.bytes().await {
        Ok(bytes) if !bytes.is_empty() => serde_json::from_slice::<Value>(&bytes).ok(),
        _ => None,
    };
    ApiError::from_response(status, body)
}
