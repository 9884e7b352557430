//! Book CRUD and rating handlers. Every handler follows the same shape:
//! verify the session, authorize by ownership, perform one store call,
//! return a JSON envelope.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::{parse_cookie, require_session, AppState, SESSION_COOKIE};
use crate::error::{AppError, AppResult};
use crate::models::{BookPatch, NewBook};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub scope: Option<String>,
}

/// GET /api/books?scope=public|user
///
/// `public` (the default) needs no auth and joins the owner's display name;
/// `user` requires a session and returns only the caller's books.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    match params.scope.as_deref().unwrap_or("public") {
        "public" => {
            let books = state.store.list_public_books().await?;
            Ok(Json(books).into_response())
        }
        "user" => {
            let principal = require_session(&state, &headers)?;
            let books = state.store.list_user_books(&principal.subject).await?;
            Ok(Json(books).into_response())
        }
        other => Err(AppError::invalid(format!("Unknown scope '{other}'"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/books
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateBookPayload>,
) -> AppResult<Response> {
    let principal = require_session(&state, &headers)?;

    let fields = NewBook {
        title: payload.title.unwrap_or_default(),
        author: payload.author.unwrap_or_default(),
        genre: payload.genre.unwrap_or_default(),
        description: payload.description.unwrap_or_default(),
    };
    if fields.first_missing_field().is_some() {
        return Err(AppError::invalid("Missing required fields"));
    }

    let book = state.store.create_book(&fields, &principal.subject).await?;
    Ok(Json(book).into_response())
}

#[derive(Debug, Deserialize)]
pub struct EditBookPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// PUT /api/books — partial update, body carries the id.
///
/// Editing describable fields requires ownership; a rating change follows
/// the configured rating policy instead.
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EditBookPayload>,
) -> AppResult<Response> {
    let principal = require_session(&state, &headers)?;

    let Some(id) = non_empty(payload.id) else {
        return Err(AppError::invalid("Book ID is required"));
    };
    let Some(book) = state.store.get_book(&id).await? else {
        return Err(AppError::not_found("Book not found"));
    };

    let patch = BookPatch {
        title: non_empty(payload.title),
        author: non_empty(payload.author),
        genre: non_empty(payload.genre),
        description: non_empty(payload.description),
    };
    let is_owner = book.user_id == principal.subject;

    if !patch.is_empty() && !is_owner {
        return Err(AppError::forbidden("Not authorized to edit this book"));
    }
    if let Some(rating) = payload.rating {
        if !state.config.rating_range().contains(&rating) {
            return Err(AppError::invalid(format!(
                "Rating must be a number between {} and 5",
                state.config.rating_min
            )));
        }
        if state.config.rate_owner_only && !is_owner {
            return Err(AppError::forbidden("Not authorized to rate this book"));
        }
    }

    let mut updated = state
        .store
        .update_book(&id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found"))?;
    if let Some(rating) = payload.rating {
        updated = state
            .store
            .update_rating(&id, rating)
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;
    }
    Ok(Json(updated).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RateParams {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RatePayload {
    #[serde(default)]
    pub rating: Option<i64>,
}

/// POST /api/books/rate?id=<id>
///
/// This endpoint keeps its historical `{success, ...}` envelope, so errors
/// are shaped inline instead of going through `AppError`.
pub async fn rate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RateParams>,
    Json(payload): Json<RatePayload>,
) -> Response {
    let principal = match parse_cookie(&headers, SESSION_COOKIE) {
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "error": "You must be logged in to rate books"})),
            )
                .into_response();
        }
        Some(token) => match state.sessions.validate(&token) {
            Some(p) => p,
            None => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"success": false, "error": "Invalid session"})),
                )
                    .into_response();
            }
        },
    };

    let Some(book_id) = params.id.filter(|s| !s.is_empty()) else {
        return rate_error(StatusCode::BAD_REQUEST, "Book ID is required");
    };
    let rating = match payload.rating {
        Some(r) if state.config.rating_range().contains(&r) => r,
        _ => {
            let msg = format!(
                "Rating must be a number between {} and 5",
                state.config.rating_min
            );
            return rate_error(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let book = match state.store.get_book(&book_id).await {
        Ok(Some(b)) => b,
        Ok(None) => return rate_error(StatusCode::NOT_FOUND, "Book not found"),
        Err(e) => {
            error!("rate lookup failed: {e:#}");
            return rate_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update book rating");
        }
    };
    if state.config.rate_owner_only && book.user_id != principal.subject {
        return rate_error(StatusCode::FORBIDDEN, "Only the owner can rate this book");
    }

    match state.store.update_rating(&book_id, rating).await {
        Ok(Some(updated)) => Json(json!({"success": true, "book": updated})).into_response(),
        Ok(None) => rate_error(StatusCode::NOT_FOUND, "Book not found"),
        Err(e) => {
            error!("rate update failed: {e:#}");
            rate_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update book rating")
        }
    }
}

fn rate_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({"success": false, "error": msg}))).into_response()
}

/// DELETE /api/books/{id}
pub async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let principal = require_session(&state, &headers)?;

    let Some(book) = state.store.get_book(&id).await? else {
        return Err(AppError::not_found("Book not found"));
    };
    if book.user_id != principal.subject {
        return Err(AppError::forbidden("Not authorized to delete this book"));
    }

    state.store.delete_book(&id).await?;
    Ok(Json(json!({"message": "Book deleted successfully"})))
}
