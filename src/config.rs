use std::{env, path::PathBuf};

use crate::{error::ConfigError, guard::ProtectedPaths};

/// Fallback upstream origin used when running locally without `UPSTREAM_API_URL`.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:3100";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PROTECTED_PATHS: &str = "/outbounds,/inbounds";
pub const DEFAULT_UI_DIR: &str = "./ui/dist";

/// AppConfig
///
/// Holds the gateway's entire configuration state. Loaded once at process start and
/// never mutated afterwards; handlers pull it out of the shared state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and production strictness.
    pub env: Env,
    // The single upstream origin every forwarded request targets (no trailing slash).
    pub upstream_url: String,
    // Socket address the HTTP listener binds to.
    pub bind_addr: String,
    // Path prefixes that require a session cookie before a page is served.
    pub protected_paths: ProtectedPaths,
    // Directory containing the built console UI bundle.
    pub ui_dir: PathBuf,
}

/// Env
///
/// Defines the runtime context. `Local` tolerates missing configuration by falling back
/// to development defaults; `Production` demands every required value explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe local values, primarily used for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            protected_paths: ProtectedPaths::parse(DEFAULT_PROTECTED_PATHS),
            ui_dir: PathBuf::from(DEFAULT_UI_DIR),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables. In production a missing
    /// `UPSTREAM_API_URL` is an error rather than a silent fallback to localhost, so the
    /// process refuses to start instead of proxying into nowhere.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let upstream = match env {
            Env::Production => env::var("UPSTREAM_API_URL")
                .map_err(|_| ConfigError::Missing("UPSTREAM_API_URL"))?,
            Env::Local => {
                env::var("UPSTREAM_API_URL").unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string())
            }
        };

        let protected_paths = env::var("PROTECTED_PATHS")
            .map(|raw| ProtectedPaths::parse(&raw))
            .unwrap_or_else(|_| ProtectedPaths::parse(DEFAULT_PROTECTED_PATHS));

        Ok(Self {
            env,
            upstream_url: normalize_upstream(&upstream)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            protected_paths,
            ui_dir: env::var("UI_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_UI_DIR)),
        })
    }
}

/// Validates the upstream origin and strips trailing slashes so path suffixes can be
/// appended with a single `/`.
pub fn normalize_upstream(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidUpstream(raw.to_string(), e))?;
    Ok(trimmed.to_string())
}
