use crate::config::SmtpConfig;
use axum::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::Arc;
use tracing::info;

/// Outbound mail seam. Delivery failures are the caller's problem to log,
/// never to surface to the end user.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset_email(&self, to: &str, reset_token: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: Arc<SmtpTransport>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = SmtpTransport::relay(&cfg.host)?
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .port(cfg.port)
            .pool_config(PoolConfig::new().max_size(4))
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();
        Ok(Self {
            transport: Arc::new(transport),
            from: cfg.from.clone(),
        })
    }
}

fn reset_email_body(reset_token: &str) -> String {
    format!(
        "Hello,\n\n\
        A password reset was requested for your account.\n\n\
        To reset your password, use the following token:\n\n\
        {}\n\n\
        This token will expire in 1 hour.\n\n\
        If you did not request this reset, please ignore this email.",
        reset_token
    )
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset_email(&self, to: &str, reset_token: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject("Password Reset Request")
            .header(lettre::message::header::ContentType::TEXT_PLAIN)
            .body(reset_email_body(reset_token))?;

        // lettre's pooled SMTP transport is blocking; keep it off the
        // request-handling threads.
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || transport.send(&email)).await??;
        Ok(())
    }
}

/// Dev fallback used when SMTP is not configured: the token only shows up
/// in the logs.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset_email(&self, to: &str, reset_token: &str) -> anyhow::Result<()> {
        info!(%to, %reset_token, "smtp not configured, logging password reset token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_email_contains_token_and_expiry() {
        let body = reset_email_body("abc123");
        assert!(body.contains("abc123"));
        assert!(body.contains("expire in 1 hour"));
        assert!(body.contains("did not request this reset"));
    }
}
