//! Outbound email — direct SMTP via lettre.
//!
//! Sending is a deterministic function call: fixed sender and recipient
//! from configuration, subject and HTML body from the caller. No agent
//! or model sits between the decision to send and the SMTP transaction.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::EmailConfig;
use crate::error::EmailError;

/// A single outbound email. Sender and recipient are configuration,
/// not request fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub subject: String,
    pub html_body: String,
}

impl EmailRequest {
    pub fn new(subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

/// Trait seam for outbound email, so the pipeline can be tested against
/// a counting stub instead of a live SMTP relay.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Recipient address, for confirmation output.
    fn recipient(&self) -> &str;

    /// Send one email. One attempt; transport errors propagate.
    async fn send(&self, email: &EmailRequest) -> Result<(), EmailError>;
}

/// SMTP mailer backed by lettre.
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, email: &EmailRequest) -> Result<Message, EmailError> {
        Message::builder()
            .from(self.config.from_address.parse().map_err(|e| {
                EmailError::InvalidAddress {
                    kind: "from",
                    address: self.config.from_address.clone(),
                    reason: format!("{e}"),
                }
            })?)
            .to(self
                .config
                .to_address
                .parse()
                .map_err(|e| EmailError::InvalidAddress {
                    kind: "to",
                    address: self.config.to_address.clone(),
                    reason: format!("{e}"),
                })?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| EmailError::Build(format!("{e}")))
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    fn recipient(&self) -> &str {
        &self.config.to_address
    }

    async fn send(&self, email: &EmailRequest) -> Result<(), EmailError> {
        // Addresses are validated before any connection is attempted.
        let message = self.build_message(email)?;

        // lettre's SmtpTransport is blocking; keep the SMTP transaction
        // off the async runtime threads.
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let transport = SmtpTransport::relay(&config.smtp_host)
                .map_err(|e| EmailError::Relay(format!("{e}")))?
                .port(config.smtp_port)
                .credentials(Credentials::new(config.username, config.password))
                .build();

            transport
                .send(&message)
                .map(|_| ())
                .map_err(|e| EmailError::Send(format!("{e}")))
        })
        .await
        .map_err(|e| EmailError::Send(format!("send task failed: {e}")))??;

        info!(to = %self.config.to_address, subject = %email.subject, "Email sent");
        Ok(())
    }
}
