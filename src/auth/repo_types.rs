use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,
}

/// Refresh ledger entry. One row per user; replaced wholesale on every
/// login or refresh, so a superseded token string matches nothing.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// Reset ledger entry. Looked up by token string and deleted on use.
#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}
