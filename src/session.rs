//! Session Store
//!
//! The session is nothing more than a client-held bearer token. It lives in two places:
//! a cookie (visible to the gateway on every request, before any client code runs) and a
//! client-local key/value store (read by in-process caller code). Both are written and
//! cleared together; reads pick a channel by execution context.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::{DateTime, TimeDelta, Utc};

/// Canonical name of the session token, both as cookie name and local-store key.
pub const SESSION_COOKIE_NAME: &str = "wms_token";
/// Login email kept for display. Never consulted for authorization.
pub const EMAIL_KEY: &str = "wms_email";
/// RFC 3339 timestamp of when the local copy of the token was written.
pub const ISSUED_AT_KEY: &str = "wms_token_issued_at";
/// Fixed session lifetime from issuance (8 hours). No sliding renewal.
pub const SESSION_MAX_AGE_SECS: i64 = 28_800;

/// Builds the session cookie with the canonical attributes.
pub fn session_cookie(token: impl Into<String>) -> Cookie<'static> {
    channel_cookie(SESSION_COOKIE_NAME, token.into(), time::Duration::seconds(SESSION_MAX_AGE_SECS))
}

/// Builds an immediately-expiring cookie that removes `name` from the browser.
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    channel_cookie(name, String::new(), time::Duration::ZERO)
}

fn channel_cookie(name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(max_age)
        .same_site(SameSite::Lax)
        .secure(true)
        .build()
}

/// Reads the session token from an inbound request's cookies.
///
/// This is the request-handling read path shared by the route guard, the console page
/// guard and the proxy forwarder. An empty cookie value counts as no session.
pub fn read_request_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

// --- Cookie channel ---

#[derive(Debug, Clone)]
struct StoredCookie {
    cookie: Cookie<'static>,
    expires_at: Option<DateTime<Utc>>,
}

/// CookieChannel
///
/// In-process cookie jar for the gateway origin. Entries honour their max-age, and a
/// cookie with a zero max-age deletes the stored entry the same way a browser would.
#[derive(Debug, Default)]
pub struct CookieChannel {
    cookies: RwLock<HashMap<String, StoredCookie>>,
}

impl CookieChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, cookie: Cookie<'static>) {
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        let max_age = cookie.max_age();

        if matches!(max_age, Some(age) if age <= time::Duration::ZERO) {
            cookies.remove(cookie.name());
            return;
        }

        let expires_at = max_age.map(|age| Utc::now() + TimeDelta::seconds(age.whole_seconds()));
        cookies.insert(
            cookie.name().to_string(),
            StoredCookie { cookie, expires_at },
        );
    }

    /// Value of a live cookie. Expired entries read as absent.
    pub fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let stored = cookies.get(name)?;
        if stored.expires_at.is_some_and(|at| at <= Utc::now()) {
            return None;
        }
        Some(stored.cookie.value().to_string())
    }

    /// The raw cookie as last set, attributes included.
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        cookies.get(name).map(|stored| stored.cookie.clone())
    }

    /// Renders the `Cookie` request header for all live entries, sorted by name.
    ///
    /// Names and values are percent-encoded, matching the decoding `CookieJar` applies on
    /// the gateway side, so a stored value arrives there unchanged.
    pub fn header_value(&self) -> Option<String> {
        let now = Utc::now();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let mut pairs: Vec<String> = cookies
            .values()
            .filter(|stored| stored.expires_at.is_none_or(|at| at > now))
            .map(|stored| {
                Cookie::new(stored.cookie.name(), stored.cookie.value())
                    .encoded()
                    .to_string()
            })
            .collect();

        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        Some(pairs.join("; "))
    }
}

// --- Client-local channel ---

/// LocalStore
///
/// Contract for the client-local persistent key/value store. Operations are infallible
/// from the caller's point of view; implementations log storage problems instead.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Shared handle to whichever local store the caller chose.
pub type LocalState = Arc<dyn LocalStore>;

/// Process-memory local store. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// FileStore
///
/// Local store persisted as a flat JSON object. Every mutation is written through to
/// disk, and `open` reloads whatever a previous process left behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable local store");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "cannot create local store directory");
                return;
            }
        }

        let result = serde_json::to_vec_pretty(entries)
            .map_err(std::io::Error::from)
            .and_then(|bytes| fs::write(&self.path, bytes));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist local store");
        }
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

// --- The store itself ---

/// Which channel a read should consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Request-handling context: the cookie channel.
    Request,
    /// In-process caller code: the client-local channel.
    Caller,
}

/// SessionStore
///
/// One abstraction over both backing channels. The two writes in `write`/`clear` are not
/// atomic; only the cookie channel is authoritative for guard checks.
#[derive(Clone)]
pub struct SessionStore {
    cookies: Arc<CookieChannel>,
    local: LocalState,
}

impl SessionStore {
    pub fn new(local: LocalState) -> Self {
        Self {
            cookies: Arc::new(CookieChannel::new()),
            local,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Persists the token to both channels, plus the login email as a display hint.
    pub fn write(&self, token: &str, email: &str) {
        self.cookies.set(session_cookie(token));
        self.cookies.set(channel_cookie(
            EMAIL_KEY,
            email.to_string(),
            time::Duration::seconds(SESSION_MAX_AGE_SECS),
        ));

        self.local.set(SESSION_COOKIE_NAME, token);
        self.local.set(EMAIL_KEY, email);
        self.local.set(ISSUED_AT_KEY, &Utc::now().to_rfc3339());
    }

    pub fn read(&self, context: Context) -> Option<String> {
        let token = match context {
            Context::Request => self.cookies.get(SESSION_COOKIE_NAME),
            Context::Caller => self.read_local(),
        };
        token.filter(|t| !t.is_empty())
    }

    fn read_local(&self) -> Option<String> {
        let token = self.local.get(SESSION_COOKIE_NAME)?;

        // A stamp that is missing or unparsable does not expire the token.
        let issued_at = self
            .local
            .get(ISSUED_AT_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok());
        if let Some(issued_at) = issued_at {
            let age = Utc::now().signed_duration_since(issued_at.with_timezone(&Utc));
            if age >= TimeDelta::seconds(SESSION_MAX_AGE_SECS) {
                return None;
            }
        }

        Some(token)
    }

    /// The login email recorded at the last successful login.
    pub fn email(&self) -> Option<String> {
        self.local
            .get(EMAIL_KEY)
            .or_else(|| self.cookies.get(EMAIL_KEY))
    }

    /// Removes token and identity hint from both channels.
    pub fn clear(&self) {
        self.cookies.set(expired_cookie(SESSION_COOKIE_NAME));
        self.cookies.set(expired_cookie(EMAIL_KEY));

        self.local.remove(SESSION_COOKIE_NAME);
        self.local.remove(EMAIL_KEY);
        self.local.remove(ISSUED_AT_KEY);
    }

    pub fn cookies(&self) -> &CookieChannel {
        &self.cookies
    }

    pub fn local(&self) -> &LocalState {
        &self.local
    }
}
