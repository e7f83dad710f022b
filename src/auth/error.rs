use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for the auth operations. Each variant carries a
/// message that is safe to return to the client as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password collapse into this single variant
    /// so a response never reveals whether an email is registered.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Email already registered.")]
    EmailTaken,

    #[error("User not found.")]
    UserNotFound,

    #[error("Invalid or expired token.")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Internal server error.")]
    Internal(anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(ref source) = self {
            error!(error = %source, "internal error");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(e: anyhow::Error) -> Self {
        AuthError::Internal(e)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Internal(e.into())
    }
}
