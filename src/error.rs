use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Configuration could not be resolved at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid upstream url {0:?}: {1}")]
    InvalidUpstream(String, url::ParseError),
}

/// ProxyError
///
/// Why a forwarded call failed. Upstream 4xx/5xx responses are not errors; they are
/// relayed verbatim. A transport-level failure (connection refused, reset, truncated
/// body) ends up here and the call then fails as a whole.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cannot append a path to upstream base {0:?}")]
    InvalidTarget(String),

    /// A path segment that is not UTF-8 once percent-decoded.
    #[error("request path does not decode to UTF-8")]
    InvalidPath,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::InvalidPath => {
                tracing::debug!(error = %self, "rejecting undecodable path");
                (StatusCode::BAD_REQUEST, "Bad Request").into_response()
            }
            _ => {
                tracing::error!(error = %self, "forwarding failed");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }
}

/// SessionError
///
/// Failures of the session lifecycle calls made by `ConsoleClient`.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No session token is stored locally; raised before any network call.
    #[error("not authenticated")]
    Unauthenticated,

    /// The upstream answered with a non-2xx status, `ok != true`, or no `data`.
    #[error("upstream rejected the request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SessionError {
    /// HTTP status associated with the failure, if there is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SessionError::Unauthenticated => Some(StatusCode::UNAUTHORIZED),
            SessionError::Rejected { status, .. } => Some(*status),
            SessionError::Transport(e) => e.status(),
        }
    }

    /// The upstream's own message, when it sent one.
    pub fn message(&self) -> Option<&str> {
        match self {
            SessionError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
