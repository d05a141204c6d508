use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Envelope
///
/// Response wrapper the upstream uses for every session endpoint. A call is successful
/// only when `ok` is true *and* `data` is present, whatever the HTTP status says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub ok: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// The payload, when the envelope reports success.
    pub fn into_data(self) -> Option<T> {
        if self.ok { self.data } else { None }
    }
}

/// Credentials posted to the upstream `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginData
///
/// `data` of a login response. `token` is optional on the wire; its absence is a failed
/// login, not a decode error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginData {
    pub token: Option<String>,
    pub token_type: Option<String>,
    // "8h" from the reference backend, but some deployments send seconds.
    #[ts(type = "string | number | null")]
    #[schema(value_type = Option<String>)]
    pub expires_in: Option<serde_json::Value>,
}

/// Returned by a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResult {
    pub token: String,
    pub email: String,
}

/// Profile
///
/// Caller identity from `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Profile {
    // Opaque upstream identifier; numeric or string depending on the backend.
    #[ts(type = "string | number")]
    #[schema(value_type = String)]
    pub id: serde_json::Value,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
}
