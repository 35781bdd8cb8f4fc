use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

use crate::error::SendError;

/// Outbound channel for goal alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. An `Err` means the caller must not consider the
    /// goal announced.
    async fn send(&self, message: &str) -> Result<(), SendError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Email-to-SMS through an authenticated SMTP relay (STARTTLS).
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(
        server: &str,
        port: u16,
        username: &str,
        password: &str,
        destination: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .with_context(|| format!("Invalid SMTP relay '{}'", server))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(timeout))
            .build();
        let from = username
            .parse::<Mailbox>()
            .with_context(|| format!("SMTP username '{}' is not an email address", username))?;
        let to = destination
            .parse::<Mailbox>()
            .with_context(|| format!("Destination '{}' is not an email address", destination))?;
        Ok(SmtpNotifier { transport, from, to })
    }
}

/// Plain-text message with an empty subject, which carriers render as a bare SMS.
fn build_email(from: &Mailbox, to: &Mailbox, body: &str) -> Result<Message, SendError> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject("")
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| SendError::new("smtp", e))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &str) -> Result<(), SendError> {
        let email = build_email(&self.from, &self.to, message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| SendError::new("smtp", e))?;
        info!("SMS sent to {}", self.to);
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Dry-run channel: logs the alert instead of sending it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), SendError> {
        info!("🟡 DRY RUN alert:\n{}", message);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
