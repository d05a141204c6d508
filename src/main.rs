use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wms_gateway::{
    AppState,
    config::{AppConfig, Env},
    create_router,
};

/// main
///
/// Loads configuration, installs logging, and serves the gateway until the process is
/// stopped.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for the gateway itself and info for tower-http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wms_gateway=debug,tower_http=info".into());

    // 3. Log format by environment: pretty locally, JSON for aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);
    tracing::info!(upstream = %config.upstream_url, "Forwarding to upstream");
    tracing::info!(prefixes = ?config.protected_paths.prefixes(), "Protected path prefixes");

    // 4. Router and Server Startup
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(config));

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%bind_addr, error = %e, "FATAL: cannot bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
        std::process::exit(1);
    }
}
