use crate::{
    AppState,
    proxy::{DASHBOARD_MOUNT, Forwarder, PROXY_MOUNT},
};
use axum::{Router, routing::MethodFilter};

/// Proxy Router Module
///
/// Mounts the two forwarding surfaces. Neither is guarded here: authorization is advisory
/// at this layer and enforced by the upstream.
pub fn proxy_routes(state: &AppState) -> Router<AppState> {
    let upstream = &state.config.upstream_url;

    Router::new()
        // ANY /api/proxy/{*path} -> upstream /{path}
        // Generic surface used by every console screen, including login and identity.
        .merge(
            Forwarder::root(state.http.clone(), upstream).routes(
                PROXY_MOUNT,
                MethodFilter::GET
                    .or(MethodFilter::POST)
                    .or(MethodFilter::PUT)
                    .or(MethodFilter::DELETE),
            ),
        )
        // GET /api/dashboard/{*path} -> upstream /api/dashboard/{path}
        // Read-only reporting data.
        .merge(
            Forwarder::dashboard(state.http.clone(), upstream)
                .routes(DASHBOARD_MOUNT, MethodFilter::GET),
        )
}
