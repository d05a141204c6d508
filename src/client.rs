//! Session Lifecycle API
//!
//! Caller-side SDK for the console. Every call goes to the gateway origin, so the upstream
//! auth endpoints are reached through the root proxy surface, and the session cookie is
//! attached to each request the way a browser would attach it.

use axum::http::{StatusCode, header};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;

use crate::{
    error::SessionError,
    models::{Envelope, LoginData, LoginRequest, LoginResult, Profile},
    proxy::PROXY_MOUNT,
    session::{Context, SessionStore},
};

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const IDENTITY_ENDPOINT: &str = "/auth/me";

/// ConsoleClient
///
/// Owns the caller's `SessionStore`. Cloning is cheap and clones share the same store.
#[derive(Clone)]
pub struct ConsoleClient {
    http: reqwest::Client,
    gateway: String,
    store: SessionStore,
}

impl ConsoleClient {
    /// Redirects are never followed, so guard redirects stay observable to the caller.
    pub fn new(gateway: &str, store: SessionStore) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder().redirect(Policy::none()).build()?;
        Ok(Self::with_http(http, gateway, store))
    }

    pub fn with_http(http: reqwest::Client, gateway: &str, store: SessionStore) -> Self {
        Self {
            http,
            gateway: gateway.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Identity hint recorded at login. Display only.
    pub fn email(&self) -> Option<String> {
        self.store.email()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.gateway, path));
        match self.store.cookies().header_value() {
            Some(cookies) => builder.header(header::COOKIE, cookies),
            None => builder,
        }
    }

    /// login
    ///
    /// Exchanges credentials for a token via the upstream login endpoint. On success the
    /// token and email are written to both session channels. On any failure the store is
    /// left exactly as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, SessionError> {
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .request(reqwest::Method::POST, &format!("{PROXY_MOUNT}{LOGIN_ENDPOINT}"))
            .json(&payload)
            .send()
            .await?;

        let (status, envelope) = read_envelope::<LoginData>(response).await?;
        let token = envelope
            .data
            .as_ref()
            .and_then(|data| data.token.clone())
            .filter(|token| !token.is_empty());

        match token {
            Some(token) if status.is_success() && envelope.ok => {
                self.store.write(&token, email);
                tracing::info!(email, "login succeeded");
                Ok(LoginResult {
                    token,
                    email: email.to_string(),
                })
            }
            _ => {
                tracing::warn!(email, %status, "login rejected");
                Err(SessionError::Rejected {
                    status,
                    message: envelope.message,
                })
            }
        }
    }

    /// get_me
    ///
    /// Fetches the caller's profile with the cookie-channel token as bearer credential.
    /// Without a token this fails with `Unauthenticated` before touching the network.
    pub async fn get_me(&self) -> Result<Profile, SessionError> {
        let token = self
            .store
            .read(Context::Request)
            .ok_or(SessionError::Unauthenticated)?;

        let response = self
            .request(reqwest::Method::GET, &format!("{PROXY_MOUNT}{IDENTITY_ENDPOINT}"))
            .bearer_auth(token)
            .send()
            .await?;

        let (status, envelope) = read_envelope::<Profile>(response).await?;
        let message = envelope.message.clone();
        match envelope.into_data() {
            Some(profile) if status.is_success() => Ok(profile),
            _ => Err(SessionError::Rejected { status, message }),
        }
    }

    /// Clears both session channels. Purely local; the upstream is not told.
    pub fn logout(&self) {
        self.store.clear();
        tracing::info!("session cleared");
    }

    /// Issues a page navigation (GET) carrying the current session cookie.
    pub async fn navigate(&self, path: &str) -> Result<reqwest::Response, SessionError> {
        Ok(self.request(reqwest::Method::GET, path).send().await?)
    }
}

/// Reads status and envelope. A body that is not a valid envelope reads as `ok = false`
/// so the caller treats it as a rejection carrying the HTTP status.
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<(StatusCode, Envelope<T>), SessionError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    let envelope = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(%status, error = %e, "response body is not a readable envelope");
        Envelope {
            ok: false,
            data: None,
            message: None,
        }
    });
    Ok((status, envelope))
}
