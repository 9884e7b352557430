//!
//! librarium HTTP server
//! ---------------------
//! Axum-based JSON API for the book catalog.
//!
//! Responsibilities:
//! - Session cookie issue/verify via the identity module (5-day TTL).
//! - Register/login/session endpoints backed by the local identity provider.
//! - Book CRUD and rating endpoints delegating to the SQLite store.
//! - Request-level gatekeeper blocking unauthenticated access to protected
//!   paths before handler dispatch.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::{delete, get, post}, Router, middleware};
use axum::http::{HeaderMap, HeaderValue};
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::{LocalIdentityProvider, Principal, SessionManager};
use crate::store::{build_sqlite_url, Store};

pub mod auth;
pub mod books;
pub mod gate;
pub mod users;

pub const SESSION_COOKIE: &str = "session";

/// Shared server state injected into all handlers. The identity provider and
/// session manager are constructed once here and passed along explicitly;
/// nothing hangs off module-level statics.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub identity: Arc<LocalIdentityProvider>,
    pub sessions: Arc<SessionManager>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        let identity = Arc::new(LocalIdentityProvider::new(store.clone()));
        let sessions = Arc::new(SessionManager::default());
        Self { store, identity, sessions, config }
    }
}

/// Start the librarium HTTP server with the given configuration.
pub async fn run(cfg: Config) -> anyhow::Result<()> {
    let url = build_sqlite_url(&cfg.db_path)?;
    let store = Store::connect(&url).await?;
    let state = AppState::new(store, cfg.clone());

    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Mount all routes plus the edge gatekeeper. Split out of `run` so tests can
/// drive the router directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "librarium ok" }))
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/session", post(auth::create_session).delete(auth::destroy_session))
        .route("/api/books", get(books::list).post(books::create).put(books::update))
        .route("/api/books/rate", post(books::rate))
        .route("/api/books/{id}", delete(books::remove))
        .route("/api/users", post(users::sync))
        .layer(middleware::from_fn(gate::gatekeeper))
        .with_state(state)
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> axum::http::StatusCode {
    if state.store.healthy().await {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

/// Session cookie: httpOnly, path-scoped to /, lifetime fixed at 5 days.
/// `Secure` only outside local development.
pub(crate) fn set_session_cookie(state: &AppState, token: &str) -> HeaderValue {
    let max_age = state.sessions.ttl().as_secs();
    let secure = if state.config.secure_cookies { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; Max-Age={}; HttpOnly; SameSite=Lax; Path=/{}",
        SESSION_COOKIE, token, max_age, secure
    ))
    .unwrap()
}

pub(crate) fn clear_session_cookie(state: &AppState) -> HeaderValue {
    let secure = if state.config.secure_cookies { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Lax; Path=/{}",
        SESSION_COOKIE, secure
    ))
    .unwrap()
}

/// The one reusable session check every protected handler goes through:
/// cookie -> session manager validation (with revocation) -> principal.
pub(crate) fn require_session(state: &AppState, headers: &HeaderMap) -> AppResult<Principal> {
    let token = parse_cookie(headers, SESSION_COOKIE)
        .ok_or_else(|| AppError::unauthenticated("Unauthorized"))?;
    state
        .sessions
        .validate(&token)
        .ok_or_else(|| AppError::unauthenticated("Unauthorized"))
}

/// Extract a bearer token from the Authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let s = auth.to_str().ok()?;
    s.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}
