//! Email delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send plain-text
//! notification and password-reset emails. If `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer is constructed.

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "ChatStory <noreply@chatstory.local>";

/// Subject prefix for every outgoing message.
const SUBJECT_PREFIX: &str = "[ChatStory]";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// Defaults to 587.
    pub smtp_port: u16,
    /// RFC 5322 "From" mailbox.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                                |
    /// |-----------------|----------|----------------------------------------|
    /// | `SMTP_HOST`     | yes      | (email disabled when unset)            |
    /// | `SMTP_PORT`     | no       | `587`                                  |
    /// | `SMTP_FROM`     | no       | `ChatStory <noreply@chatstory.local>`  |
    /// | `SMTP_USER`     | no       |                                        |
    /// | `SMTP_PASSWORD` | no       |                                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends plain-text emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Email a copy of an in-app notification.
    pub async fn send_notification(
        &self,
        to_email: &str,
        title: &str,
        message: &str,
    ) -> Result<(), EmailError> {
        let body = format!(
            "{message}\n\nYou are receiving this because email notifications are enabled \
             on your ChatStory account. You can turn them off in your profile settings."
        );
        self.send(to_email, title, body).await
    }

    /// Email a password-reset link.
    pub async fn send_password_reset(
        &self,
        to_email: &str,
        reset_url: &str,
        valid_minutes: i64,
    ) -> Result<(), EmailError> {
        self.send(to_email, "Reset your password", password_reset_body(reset_url, valid_minutes))
            .await
    }

    async fn send(&self, to_email: &str, subject: &str, body: String) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(format!("{SUBJECT_PREFIX} {subject}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = to_email, subject, "Email sent");
        Ok(())
    }
}

fn password_reset_body(reset_url: &str, valid_minutes: i64) -> String {
    format!(
        "Someone asked to reset the password of your ChatStory account.\n\n\
         Open this link to choose a new password:\n{reset_url}\n\n\
         The link is valid for {valid_minutes} minutes and can be used once. \
         If you did not ask for this, ignore this email."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[test]
    fn default_sender_is_a_valid_mailbox() {
        let mailbox: Result<lettre::message::Mailbox, _> = DEFAULT_FROM_ADDRESS.parse();
        assert!(mailbox.is_ok());
    }

    #[test]
    fn reset_body_carries_link_and_validity() {
        let body = password_reset_body("https://app.example/reset?token=abc", 60);
        assert!(body.contains("https://app.example/reset?token=abc"));
        assert!(body.contains("60 minutes"));
    }
}
