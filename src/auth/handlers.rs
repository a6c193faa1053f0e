use axum::{
    extract::State,
    routing::{post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
            MessageResponse, RefreshRequest, ResetPasswordRequest, SignupRequest,
            TokenPairResponse,
        },
        error::AuthError,
        extractors::AuthUser,
    },
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Fixed acknowledgment: identical whether or not the account exists.
const FORGOT_PASSWORD_ACK: &str = "If this account exists, an email will be sent";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_password_len(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short".into()));
    }
    Ok(())
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/change-password", put(change_password))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if !is_valid_email(&payload.email) {
        warn!("signup with malformed email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    check_password_len(&payload.password)?;

    state
        .auth
        .sign_up(&payload.email, &payload.name, &payload.password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Account created".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    if !is_valid_email(&payload.email) {
        warn!("login with malformed email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    let session = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(LoginResponse {
        access_token: session.tokens.access_token,
        refresh_token: session.tokens.refresh_token,
        user_id: session.user_id,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>, AuthError> {
    let pair = state.auth.refresh_tokens(&payload.refresh_token).await?;
    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    check_password_len(&payload.new_password)?;

    state
        .auth
        .change_password(user_id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password successfully changed".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if !is_valid_email(&payload.email) {
        warn!("forgot-password with malformed email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    state.auth.forgot_password(&payload.email).await?;
    Ok(Json(MessageResponse {
        message: FORGOT_PASSWORD_ACK.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    check_password_len(&payload.new_password)?;

    state
        .auth
        .reset_password(&payload.new_password, &payload.reset_token)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset".into(),
    }))
}
