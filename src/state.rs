use crate::auth::jwt::JwtKeys;
use crate::auth::password::Hasher;
use crate::auth::repo::{PgRefreshTokenStore, PgResetTokenStore, PgUserStore};
use crate::auth::service::AuthService;
use crate::config::AppConfig;
use crate::mailer::{LogMailer, Mailer, SmtpMailer};
use sqlx::PgPool;
use std::sync::Arc;
use time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        Self::from_parts(db, config)
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => Arc::new(LogMailer),
        };

        let auth = AuthService::new(
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgRefreshTokenStore::new(db.clone())),
            Arc::new(PgResetTokenStore::new(db.clone())),
            mailer,
            JwtKeys::from_config(&config.jwt),
            Hasher::new(&config.hasher)?,
            Duration::days(config.refresh_ttl_days),
            Duration::minutes(config.reset_ttl_minutes),
        );

        Ok(Self { db, config, auth })
    }
}
