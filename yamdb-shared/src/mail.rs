//! Outgoing mail
//!
//! Signup sends the confirmation code by email. [`SmtpMailer`] delivers via
//! the `lettre` async SMTP transport (STARTTLS); [`LogMailer`] writes the
//! message to the log instead and is used whenever `SMTP_HOST` is unset.
//!
//! # Example
//!
//! ```no_run
//! use yamdb_shared::mail::{confirmation_email, mailer_from_env, Mailer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mailer = mailer_from_env()?;
//! mailer.send(confirmation_email("reader@example.com", "reader", "Abc123")).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

/// Default SMTP port (STARTTLS)
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@yamdb.local";

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport failure (connection, authentication, rejection)
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// Sender or recipient address did not parse
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// MIME message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),
}

/// A plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver [`OutgoingMail`]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Builds the signup message carrying a confirmation code
pub fn confirmation_email(to: &str, username: &str, code: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "YaMDb confirmation code".to_string(),
        body: format!(
            "Hello, {username}!\n\n\
             Your confirmation code: {code}\n\n\
             Send it with your username to /api/v1/auth/token/ to receive an access token.\n"
        ),
    }
}

/// SMTP settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl MailConfig {
    /// Loads SMTP settings from the environment
    ///
    /// Returns None when `SMTP_HOST` is unset.
    ///
    /// | Variable        | Default               |
    /// |-----------------|-----------------------|
    /// | `SMTP_HOST`     | -                     |
    /// | `SMTP_PORT`     | `587`                 |
    /// | `SMTP_FROM`     | `noreply@yamdb.local` |
    /// | `SMTP_USER`     | -                     |
    /// | `SMTP_PASSWORD` | -                     |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM").unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// Delivers mail through an SMTP relay
pub struct SmtpMailer {
    from: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Builds the transport; no connection is made until the first send
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from: config.from_address,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(mail.to.parse()?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(message).await?;

        tracing::info!(to = %mail.to, "Email sent");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, body = %mail.body, "Email (not sent, SMTP disabled)");
        Ok(())
    }
}

/// SMTP mailer when configured, log mailer otherwise
pub fn mailer_from_env() -> Result<Arc<dyn Mailer>, MailError> {
    match MailConfig::from_env() {
        Some(config) => {
            tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP mail delivery enabled");
            Ok(Arc::new(SmtpMailer::new(config)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, emails will be written to the log");
            Ok(Arc::new(LogMailer))
        }
    }
}
