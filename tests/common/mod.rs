#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::net::TcpListener;
use wms_gateway::{AppConfig, AppState, create_router};

pub const VALID_EMAIL: &str = "ops@example.com";
pub const VALID_PASSWORD: &str = "secret";
pub const TOKENLESS_EMAIL: &str = "tokenless@example.com";
pub const ISSUED_TOKEN: &str = "abc";
// `/auth/me` answers this one with a profile that has no role.
pub const ROLELESS_TOKEN: &str = "no-role";

/// A running stand-in for the upstream API.
pub struct MockUpstream {
    pub address: String,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    /// Number of requests the upstream has received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn count_hits(State(hits): State<Arc<AtomicUsize>>, request: Request, next: Next) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    if email == VALID_EMAIL && password == VALID_PASSWORD {
        return Json(json!({
            "ok": true,
            "data": { "token": ISSUED_TOKEN, "tokenType": "Bearer", "expiresIn": "8h" }
        }))
        .into_response();
    }
    if email == TOKENLESS_EMAIL {
        return Json(json!({ "ok": true, "data": { "tokenType": "Bearer" } })).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "ok": false, "message": "invalid credentials" })),
    )
        .into_response()
}

async fn me(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {ISSUED_TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Json(json!({
            "ok": true,
            "data": { "id": 1, "email": VALID_EMAIL, "role": "admin", "name": "Ops Lead" }
        }))
        .into_response(),
        Some(value) if value == format!("Bearer {ROLELESS_TOKEN}") => Json(json!({
            "ok": true,
            "data": { "id": 2, "email": VALID_EMAIL }
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "message": "unauthorized" })),
        )
            .into_response(),
    }
}

async fn missing() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"ok":false,"message":"not found"}"#,
    )
        .into_response()
}

// No content-type header at all.
async fn bare() -> Response {
    Response::new(Body::from("bare body"))
}

async fn text() -> Response {
    ([(header::CONTENT_TYPE, "text/plain")], "hello").into_response()
}

/// Reflects what the upstream received back as JSON.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let read = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "authorization": read(header::AUTHORIZATION),
        "content_type": read(header::CONTENT_TYPE),
        "cache_control": read(header::CACHE_CONTROL),
        "body": String::from_utf8_lossy(&body),
    }))
}

pub async fn spawn_mock_upstream() -> MockUpstream {
    let hits = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/missing", get(missing))
        .route("/bare", get(bare))
        .route("/text", get(text))
        .fallback(echo)
        .layer(middleware::from_fn_with_state(hits.clone(), count_hits));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock upstream");
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockUpstream { address, hits }
}

/// Address that refuses connections: bound once, then released.
pub async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    address
}

/// A throwaway UI bundle with a console shell and a couple of pages.
pub fn ui_fixture(name: &str) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "wms-gateway-{}-{}-{}",
        name,
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(dir.join("outbounds")).unwrap();
    std::fs::write(dir.join("index.html"), "<html>console shell</html>").unwrap();
    std::fs::write(dir.join("about.html"), "<html>about</html>").unwrap();
    std::fs::write(dir.join("outbounds").join("list.html"), "<html>outbounds</html>").unwrap();
    dir
}

pub fn test_config(upstream: &str, ui_dir: PathBuf) -> AppConfig {
    AppConfig {
        upstream_url: upstream.to_string(),
        ui_dir,
        ..AppConfig::default()
    }
}

pub fn app(config: AppConfig) -> Router {
    create_router(AppState::new(config))
}

/// Serves the gateway on an ephemeral port and returns its base URL.
pub async fn spawn_gateway(config: AppConfig) -> String {
    let router = app(config);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind gateway");
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    address
}

pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
