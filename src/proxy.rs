//! Proxy Forwarder
//!
//! One forwarding algorithm, parameterised by the upstream sub-path it mirrors onto and
//! the methods it accepts. The gateway mounts it twice: `/api/proxy/*` onto the upstream
//! root and `/api/dashboard/*` onto the upstream's `/api/dashboard/`.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{MethodFilter, on},
};
use axum_extra::extract::CookieJar;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::{error::ProxyError, session::read_request_token};

/// Gateway mount point of the root-mirrored surface.
pub const PROXY_MOUNT: &str = "/api/proxy";
/// Gateway mount point of the dashboard-scoped surface.
pub const DASHBOARD_MOUNT: &str = "/api/dashboard";
/// Upstream sub-path mirrored by the dashboard surface.
pub const DASHBOARD_PREFIX: &str = "/api/dashboard/";

/// ForwardRequest
///
/// Everything the forwarder keeps from an inbound request. Built per call and dropped
/// once the upstream call completes.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    // Percent-decoded path components, in order.
    pub segments: Vec<String>,
    // Raw query string without the leading `?`, passed through untouched.
    pub query: Option<String>,
    pub content_type: Option<HeaderValue>,
    pub authorization: Option<HeaderValue>,
    // Absent for GET and HEAD regardless of what the caller sent.
    pub body: Option<Bytes>,
}

impl ForwardRequest {
    /// Assembles the descriptor from inbound request pieces.
    ///
    /// Authorization precedence: an explicit inbound `authorization` header is kept
    /// verbatim; otherwise a session token becomes `Bearer <token>`; otherwise the header
    /// is left out and the upstream decides.
    pub fn new(
        method: Method,
        segments: Vec<String>,
        query: Option<&str>,
        headers: &HeaderMap,
        session_token: Option<&str>,
        body: Bytes,
    ) -> Self {
        let authorization = headers.get(header::AUTHORIZATION).cloned().or_else(|| {
            session_token.and_then(|token| HeaderValue::from_str(&format!("Bearer {token}")).ok())
        });

        let body = if method == Method::GET || method == Method::HEAD {
            None
        } else {
            Some(body)
        };

        Self {
            segments,
            query: query.filter(|q| !q.is_empty()).map(str::to_owned),
            content_type: headers.get(header::CONTENT_TYPE).cloned(),
            authorization,
            method,
            body,
        }
    }
}

/// Splits a raw (still percent-encoded) path suffix on `/` and decodes each segment on
/// its own, so an encoded `%2F` stays inside its segment. `None` when a segment does not
/// decode to UTF-8.
pub fn decode_segments(raw: &str) -> Option<Vec<String>> {
    raw.split('/')
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .ok()
                .map(|decoded| decoded.into_owned())
        })
        .collect()
}

/// UpstreamResponse
///
/// A fully-read upstream response. Status and body are relayed byte for byte; the
/// content type falls back to `application/json` when the upstream sent none.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

/// Forwarder
///
/// Relays requests to a fixed base (`upstream origin + prefix`). It holds no per-request
/// state, so a single instance serves any number of concurrent calls.
#[derive(Clone, Debug)]
pub struct Forwarder {
    http: reqwest::Client,
    base: String,
}

impl Forwarder {
    /// `prefix` is the upstream sub-path, with both leading and trailing slash
    /// (`/` for the root surface).
    pub fn new(http: reqwest::Client, upstream: &str, prefix: &str) -> Self {
        Self {
            http,
            base: format!("{}{}", upstream.trim_end_matches('/'), prefix),
        }
    }

    /// Mirrors path segments onto the upstream root.
    pub fn root(http: reqwest::Client, upstream: &str) -> Self {
        Self::new(http, upstream, "/")
    }

    /// Mirrors path segments under the upstream's dashboard reporting API.
    pub fn dashboard(http: reqwest::Client, upstream: &str) -> Self {
        Self::new(http, upstream, DASHBOARD_PREFIX)
    }

    /// Appends the segments to the base, re-encoding each one, and attaches the raw query.
    pub fn target_url(&self, request: &ForwardRequest) -> Result<Url, ProxyError> {
        let invalid = || ProxyError::InvalidTarget(self.base.clone());
        let mut url = Url::parse(&self.base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(&request.segments);
        url.set_query(request.query.as_deref());
        Ok(url)
    }

    /// forward
    ///
    /// Performs exactly one upstream call and reads the answer in full. Upstream error
    /// statuses come back as `Ok`; only transport failures are `Err`. Nothing is retried.
    pub async fn forward(&self, request: ForwardRequest) -> Result<UpstreamResponse, ProxyError> {
        let url = self.target_url(&request)?;
        tracing::debug!(method = %request.method, target = %url, "forwarding to upstream");

        let mut outbound = self
            .http
            .request(request.method, url)
            .header(header::CACHE_CONTROL, "no-store");

        if let Some(content_type) = request.content_type {
            outbound = outbound.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(authorization) = request.authorization {
            outbound = outbound.header(header::AUTHORIZATION, authorization);
        }
        if let Some(body) = request.body {
            outbound = outbound.body(body);
        }

        let response = outbound.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    /// Mounts this forwarder at `<mount>/{*path}` for the given methods.
    pub fn routes<S>(self, mount: &str, methods: MethodFilter) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let surface = Surface {
            forwarder: self,
            mount: format!("{mount}/"),
        };
        Router::new()
            .route(&format!("{mount}/{{*path}}"), on(methods, forward_handler))
            .layer(DefaultBodyLimit::disable())
            .with_state(Arc::new(surface))
    }
}

// A forwarder bound to its gateway mount, so the handler can cut the raw path suffix
// out of the request URI instead of taking the already-decoded wildcard capture.
#[derive(Debug)]
struct Surface {
    forwarder: Forwarder,
    mount: String,
}

async fn forward_handler(
    State(surface): State<Arc<Surface>>,
    jar: CookieJar,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<UpstreamResponse, ProxyError> {
    let raw = uri.path().strip_prefix(surface.mount.as_str()).unwrap_or_default();
    let segments = decode_segments(raw).ok_or(ProxyError::InvalidPath)?;

    let token = read_request_token(&jar);
    let request = ForwardRequest::new(
        method,
        segments,
        uri.query(),
        &headers,
        token.as_deref(),
        body,
    );
    surface.forwarder.forward(request).await
}
