use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod proxy;
pub mod session;

// Route groups (public, console shell, proxy surfaces).
pub mod routes;
use routes::{console, proxy as proxy_routes, public};

// --- Public Re-exports ---

pub use client::ConsoleClient;
pub use config::AppConfig;
pub use guard::ProtectedPaths;
pub use proxy::Forwarder;
pub use session::SessionStore;

/// ApiDoc
///
/// OpenAPI document for the gateway's own endpoints and the session models it relays.
/// Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(routes::public::health),
    components(
        schemas(
            models::LoginRequest, models::LoginData, models::LoginResult, models::Profile,
        )
    ),
    tags(
        (name = "wms-gateway", description = "Session-authenticated gateway for the warehouse console")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container handed to every handler: the configuration loaded at
/// startup and the single HTTP client used for all upstream calls.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Connection pool for upstream calls. Carries no cache and no cookie store.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for ProtectedPaths {
    fn from_ref(app_state: &AppState) -> ProtectedPaths {
        app_state.config.protected_paths.clone()
    }
}

/// create_router
///
/// Assembles the routes, the UI fallback, the route guard and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let ui = ServeDir::new(&state.config.ui_dir);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(console::console_routes())
        .merge(proxy_routes::proxy_routes(&state))
        // Everything else is a page of the console UI bundle.
        .fallback_service(ui)
        // The guard wraps every route and the fallback, so it sees every navigation.
        .layer(middleware::from_fn_with_state(
            ProtectedPaths::from_ref(&state),
            guard::route_guard,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for each request, correlated by the generated `x-request-id`. Headers are not
/// recorded, so session cookies and bearer tokens never reach the logs.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
