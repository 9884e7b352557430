//! Edge gatekeeper: a pre-dispatch filter that blocks unauthenticated access
//! to protected paths on cookie presence alone. Full session validation
//! (expiry, revocation) stays with the handlers; the gate only keeps
//! obviously anonymous traffic away from them.
//!
//! Canonical policy: `GET /api/books` is the one public API operation; every
//! other verb or sub-path under `/api/books` needs the session cookie, as
//! does the `/my-books` browser path. API callers get a JSON 401, browser
//! navigation is redirected to `/auth`.

use axum::Json;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;

use super::{parse_cookie, SESSION_COOKIE};

/// Browser paths that always require a session.
const PROTECTED_PAGES: &[&str] = &["/my-books"];

fn requires_session(method: &Method, path: &str) -> bool {
    if PROTECTED_PAGES.iter().any(|p| path.starts_with(p)) {
        return true;
    }
    if path == "/api/books" && method == Method::GET {
        return false;
    }
    path.starts_with("/api/books")
}

pub async fn gatekeeper(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if requires_session(&method, &path) && parse_cookie(req.headers(), SESSION_COOKIE).is_none() {
        if path.starts_with("/api") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Authentication required"})),
            )
                .into_response();
        }
        return Redirect::temporary("/auth").into_response();
    }

    next.run(req).await
}
