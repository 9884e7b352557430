//! Unified application error model and HTTP mapping.
//! Every handler failure is folded into `AppError` at the route boundary and
//! rendered as a JSON `{error}` body with the matching status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Missing or invalid credential.
    Unauthenticated { message: String },
    /// Valid credential, insufficient permission.
    Forbidden { message: String },
    NotFound { message: String },
    InvalidInput { message: String },
    /// Identity-provider or store failure. The original error is logged
    /// server-side; only a generic message leaves the process.
    Upstream { message: String },
}

impl AppError {
    pub fn unauthenticated<S: Into<String>>(msg: S) -> Self {
        AppError::Unauthenticated { message: msg.into() }
    }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        AppError::Forbidden { message: msg.into() }
    }
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound { message: msg.into() }
    }
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        AppError::InvalidInput { message: msg.into() }
    }
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        AppError::Upstream { message: msg.into() }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::Unauthenticated { .. } => "unauthenticated",
            AppError::Forbidden { .. } => "forbidden",
            AppError::NotFound { .. } => "not_found",
            AppError::InvalidInput { .. } => "invalid_input",
            AppError::Upstream { .. } => "upstream",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthenticated { message }
            | AppError::Forbidden { message }
            | AppError::NotFound { message }
            | AppError::InvalidInput { message }
            | AppError::Upstream { message } => message.as_str(),
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Store/provider internals surface through anyhow; keep the detail in
        // the log and hand the client a generic message.
        tracing::error!("internal error: {err:#}");
        AppError::Upstream { message: "Internal server error".into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.http_status(), Json(json!({"error": self.message()}))).into_response()
    }
}
