use crate::core::Notifier;
use crate::core::config::EmailConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

/// Sends the run summary through an SMTP relay with STARTTLS.
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .with_context(|| format!("Invalid sender address: {}", self.config.from))?;
        let to: Mailbox = self
            .config
            .to
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", self.config.to))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build email message")
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .with_context(|| format!("Invalid SMTP host: {}", self.config.host))?
            .port(self.config.port);
        if !self.config.login.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.login.clone(),
                self.config.password.clone(),
            ));
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(subject, body)?;
        debug!(host = %self.config.host, port = self.config.port, "Sending notification");

        self.transport()?
            .send(message)
            .await
            .with_context(|| format!("Failed to send email via {}", self.config.host))?;

        info!("Sent notification to {}", self.config.to);
        Ok(())
    }
}
