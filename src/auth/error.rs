use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Terminal business-logic rejections surfaced to the caller as-is.
/// `Internal` hides its cause behind a generic message; the cause is
/// logged when the response is built.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already in use")]
    DuplicateCredential,
    #[error("Wrong credentials")]
    InvalidCredentials,
    #[error("Refresh token is invalid")]
    InvalidRefreshToken,
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid token")]
    InvalidToken,
    #[error("{0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::DuplicateCredential => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidResetToken
            | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(e) => {
                error!(error = %e, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
