//! User-row sync: upsert the caller's user record from a verified bearer
//! token. Runs on first sign-in so book ownership always references an
//! existing user.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use super::{bearer_token, AppState};
use crate::error::{AppError, AppResult};
use crate::identity::IdentityProvider;
use crate::models::User;

/// POST /api/users
pub async fn sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<User>> {
    let Some(token) = bearer_token(&headers) else {
        return Err(AppError::unauthenticated("Unauthorized"));
    };
    let Some(principal) = state.identity.verify_id_token(&token) else {
        return Err(AppError::unauthenticated("Invalid token"));
    };
    let user = state
        .store
        .upsert_user(&principal.subject, &principal.email, principal.display_name.as_deref())
        .await?;
    Ok(Json(user))
}
