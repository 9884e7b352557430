//! Registration, password sign-in and the session cookie exchange.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::{bearer_token, clear_session_cookie, parse_cookie, set_session_cookie, AppState, SESSION_COOKIE};
use crate::error::{AppError, AppResult};
use crate::identity::{RegisterError, RegisterRequest};

#[derive(Debug, Deserialize)]
pub struct CredentialsPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsPayload {
    fn required(self) -> AppResult<(String, String)> {
        match (self.email, self.password) {
            (Some(e), Some(p)) if !e.trim().is_empty() && !p.is_empty() => Ok((e, p)),
            _ => Err(AppError::invalid("Email and password are required")),
        }
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> AppResult<Json<Value>> {
    let (email, password) = payload.required()?;
    match state.identity.register(&RegisterRequest { email, password }).await {
        Ok(_) => Ok(Json(json!({"message": "User created successfully"}))),
        Err(e @ (RegisterError::InvalidEmail
        | RegisterError::WeakPassword
        | RegisterError::EmailTaken)) => Err(AppError::invalid(e.to_string())),
        Err(RegisterError::Store(e)) => {
            error!("register failed: {e:#}");
            Err(AppError::upstream("Failed to create account"))
        }
    }
}

/// POST /api/auth/login — password sign-in, returns a short-lived ID token
/// to exchange for a session cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> AppResult<Json<Value>> {
    let (email, password) = payload.required()?;
    match state.identity.sign_in(&email, &password).await? {
        Some(token) => Ok(Json(json!({"token": token}))),
        None => Err(AppError::unauthenticated("Invalid credentials")),
    }
}

/// POST /api/auth/session — exchange `Authorization: Bearer <idToken>` for
/// the session cookie.
pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<Value>)> {
    use crate::identity::IdentityProvider;

    let Some(token) = bearer_token(&headers) else {
        return Err(AppError::unauthenticated("Unauthorized"));
    };
    let Some(principal) = state.identity.verify_id_token(&token) else {
        return Err(AppError::unauthenticated("Invalid token"));
    };
    let session = state.sessions.issue(principal);
    let mut out = HeaderMap::new();
    out.insert("Set-Cookie", set_session_cookie(&state, &session.token));
    Ok((out, Json(json!({"status": "success"}))))
}

/// DELETE /api/auth/session — sign-out: revoke the session and clear the
/// cookie. Succeeds even without a live session so sign-out is idempotent.
pub async fn destroy_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (HeaderMap, Json<Value>) {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        state.sessions.logout(&token);
    }
    let mut out = HeaderMap::new();
    out.insert("Set-Cookie", clear_session_cookie(&state));
    (out, Json(json!({"status": "success"})))
}
