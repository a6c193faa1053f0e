use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
}

/// Argon2 work factor. Defaults are the argon2 crate's recommended
/// parameters; raise memory/iterations to make offline brute force slower.
#[derive(Debug, Clone, Deserialize)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hasher: HasherConfig,
    pub refresh_ttl_days: i64,
    pub reset_ttl_minutes: i64,
    /// When absent, password reset tokens are logged instead of mailed.
    pub smtp: Option<SmtpConfig>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "credo".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "credo-users".into()),
            access_ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
        };
        let hasher = HasherConfig {
            memory_kib: env_parse("ARGON2_MEMORY_KIB", 19_456),
            iterations: env_parse("ARGON2_ITERATIONS", 2),
            parallelism: env_parse("ARGON2_PARALLELISM", 1),
        };
        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT", 587),
                username: std::env::var("SMTP_USERNAME")?,
                password: std::env::var("SMTP_PASSWORD")?,
                from: std::env::var("SMTP_FROM")?,
            }),
            Err(_) => None,
        };
        Ok(Self {
            database_url,
            jwt,
            hasher,
            refresh_ttl_days: env_parse("REFRESH_TTL_DAYS", 3),
            reset_ttl_minutes: env_parse("RESET_TTL_MINUTES", 60),
            smtp,
        })
    }
}
