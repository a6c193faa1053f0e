use crate::auth::repo_types::{RefreshToken, ResetToken, User};
use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// Credential store. Emails are matched case-sensitively, exactly as
/// stored.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, email: &str, name: &str, password_hash: &str) -> anyhow::Result<User>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
}

/// Refresh ledger: at most one live entry per user.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Atomic last-writer-wins upsert keyed by user id.
    async fn upsert_for_user(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Exact-token lookup restricted to entries that have not expired.
    async fn find_valid(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<RefreshToken>>;

    async fn delete_for_user(&self, user_id: Uuid) -> anyhow::Result<()>;
}

/// Reset ledger: entries are consumed at most once.
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Atomic find-and-delete: returns the entry only if it was still
    /// valid, and removes it in the same storage operation so two
    /// concurrent resets cannot both succeed.
    async fn take_valid(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<ResetToken>>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, email: &str, name: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

pub struct PgRefreshTokenStore {
    db: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn upsert_for_user(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_valid(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<RefreshToken>> {
        let entry = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT user_id, token, expires_at, created_at
            FROM refresh_tokens
            WHERE token = $1 AND expires_at >= $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(entry)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

pub struct PgResetTokenStore {
    db: PgPool,
}

impl PgResetTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResetTokenStore for PgResetTokenStore {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reset_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn take_valid(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<ResetToken>> {
        // Single-statement delete keeps consumption linearizable per token.
        let entry = sqlx::query_as::<_, ResetToken>(
            r#"
            DELETE FROM reset_tokens
            WHERE token = $1 AND expires_at >= $2
            RETURNING token, user_id, expires_at, created_at
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(entry)
    }
}
