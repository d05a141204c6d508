use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. Paths under the protected prefixes must not be
/// registered here; the route guard would intercept them anyway.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and container orchestration.
        .route("/health", get(health))
}

/// health
///
/// Returns "ok" as soon as the process is serving requests. Does not contact the upstream.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Gateway is serving", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
