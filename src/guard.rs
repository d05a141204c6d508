use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use url::form_urlencoded;

use crate::session::read_request_token;

/// Login entry point every guard redirects to.
pub const LOGIN_PATH: &str = "/login";

/// ProtectedPaths
///
/// Ordered set of path prefixes for which a session cookie is required. Matching is an
/// ordinal, case-sensitive `starts_with`, so `/outbounds` also covers `/outbounds/42`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedPaths {
    prefixes: Arc<[String]>,
}

impl ProtectedPaths {
    pub fn new<I, P>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::<String>::into).collect(),
        }
    }

    /// Parses a comma-separated list, skipping blank entries.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty()),
        )
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Builds `/login?next=<path>` with the path form-urlencoded.
pub fn login_redirect_target(path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", path)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// route_guard
///
/// Runs before every route and the UI fallback. Unprotected paths pass untouched.
/// Protected paths need a non-empty session cookie; the token is never validated here,
/// only its presence. Without one the caller is sent to the login page with a `next`
/// parameter pointing back at the original path.
pub async fn route_guard(
    State(paths): State<ProtectedPaths>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    if !paths.is_protected(&path) {
        return next.run(request).await;
    }

    if read_request_token(&jar).is_some() {
        return next.run(request).await;
    }

    tracing::debug!(path = %path, "no session cookie on protected path, redirecting to login");
    Redirect::temporary(&login_redirect_target(&path)).into_response()
}

/// ConsoleSession
///
/// Page-level guard for the authenticated console shell. Independent of the configured
/// prefixes: if the session cookie is missing the request is redirected to the login page
/// without a return path.
#[derive(Debug, Clone)]
pub struct ConsoleSession {
    pub token: String,
}

impl<S> FromRequestParts<S> for ConsoleSession
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        read_request_token(&jar)
            .map(|token| ConsoleSession { token })
            .ok_or_else(|| Redirect::temporary(LOGIN_PATH))
    }
}
