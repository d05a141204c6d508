use crate::{AppConfig, AppState, guard::ConsoleSession};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};

/// Console Router Module
///
/// The authenticated console shell. Every handler here takes `ConsoleSession`, which
/// redirects to `/login` when the session cookie is missing. This check does not depend on
/// the configured protected prefixes.
pub fn console_routes() -> Router<AppState> {
    Router::new()
        // GET /console
        // Entry point of the single-page console.
        .route("/console", get(console_shell))
        // GET /console/{*rest}
        // Deep links inside the console resolve to the same shell; the client routes them.
        .route("/console/{*rest}", get(console_shell))
}

/// Serves `<UI_DIR>/index.html` to an authenticated caller.
async fn console_shell(_session: ConsoleSession, State(config): State<AppConfig>) -> Response {
    let index = config.ui_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!(path = %index.display(), error = %e, "console shell not found");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
