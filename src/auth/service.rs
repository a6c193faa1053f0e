use crate::auth::error::AuthError;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::Hasher;
use crate::auth::repo::{RefreshTokenStore, ResetTokenStore, UserStore};
use crate::mailer::Mailer;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

pub const RESET_TOKEN_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: TokenPair,
    pub user_id: Uuid,
}

/// Orchestrates the credential and session lifecycle: signup, login,
/// refresh rotation, password change and self-service password recovery.
/// All collaborators are injected, so tests can swap in fakes.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    reset_tokens: Arc<dyn ResetTokenStore>,
    mailer: Arc<dyn Mailer>,
    keys: JwtKeys,
    hasher: Hasher,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        reset_tokens: Arc<dyn ResetTokenStore>,
        mailer: Arc<dyn Mailer>,
        keys: JwtKeys,
        hasher: Hasher,
        refresh_ttl: Duration,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            reset_tokens,
            mailer,
            keys,
            hasher,
            refresh_ttl,
            reset_ttl,
        }
    }

    pub async fn sign_up(&self, email: &str, name: &str, password: &str) -> Result<(), AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            warn!("signup with an email already in use");
            return Err(AuthError::DuplicateCredential);
        }
        let hash = self.hash_password(password.to_owned()).await?;
        let user = self.users.create(email, name, &hash).await?;
        info!(user_id = %user.id, "user signed up");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        // Unknown email and wrong password produce the same error, so the
        // caller cannot tell which factor failed.
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .verify_password(password.to_owned(), user.password_hash.clone())
            .await?;
        if !ok {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.generate_tokens(user.id).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(Session {
            tokens,
            user_id: user.id,
        })
    }

    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let entry = self
            .refresh_tokens
            .find_valid(refresh_token, OffsetDateTime::now_utc())
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        // Rotation: the upsert overwrites the ledger row, so the token the
        // caller just presented can never authenticate again.
        let tokens = self.generate_tokens(entry.user_id).await?;
        info!(user_id = %entry.user_id, "refresh token rotated");
        Ok(tokens)
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ok = self
            .verify_password(old_password.to_owned(), user.password_hash.clone())
            .await?;
        if !ok {
            warn!(user_id = %user.id, "password change with wrong old password");
            return Err(AuthError::InvalidCredentials);
        }

        let hash = self.hash_password(new_password.to_owned()).await?;
        self.users.update_password_hash(user.id, &hash).await?;

        // A password change ends the live session: the refresh ledger entry
        // is dropped and the user must log in again.
        self.refresh_tokens.delete_for_user(user.id).await?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// The caller-visible outcome is identical whether or not the account
    /// exists; only the mail dispatch differs.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        if let Some(user) = self.users.find_by_email(email).await? {
            let token = generate_reset_token();
            let expires_at = OffsetDateTime::now_utc() + self.reset_ttl;
            self.reset_tokens.create(user.id, &token, expires_at).await?;
            info!(user_id = %user.id, "password reset token issued");

            // Fire-and-forget: delivery failures never change the response.
            if let Err(e) = self
                .mailer
                .send_password_reset_email(&user.email, &token)
                .await
            {
                warn!(user_id = %user.id, error = %e, "password reset email dispatch failed");
            }
        }
        Ok(())
    }

    pub async fn reset_password(
        &self,
        new_password: &str,
        reset_token: &str,
    ) -> Result<(), AuthError> {
        let entry = self
            .reset_tokens
            .take_valid(reset_token, OffsetDateTime::now_utc())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let user = self
            .users
            .find_by_id(entry.user_id)
            .await?
            .ok_or_else(|| {
                AuthError::Internal(anyhow::anyhow!(
                    "reset token references missing user {}",
                    entry.user_id
                ))
            })?;

        let hash = self.hash_password(new_password.to_owned()).await?;
        self.users.update_password_hash(user.id, &hash).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    async fn generate_tokens(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let access_token = self.keys.sign_access(user_id)?;
        let refresh_token = Uuid::new_v4().to_string();
        let expires_at = OffsetDateTime::now_utc() + self.refresh_ttl;
        self.refresh_tokens
            .upsert_for_user(user_id, &refresh_token, expires_at)
            .await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    // Argon2 is deliberately expensive; keep it off the async threads.

    async fn hash_password(&self, plain: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(anyhow::Error::from)??;
        Ok(hash)
    }

    async fn verify_password(&self, plain: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(anyhow::Error::from)??;
        Ok(ok)
    }
}

fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}
