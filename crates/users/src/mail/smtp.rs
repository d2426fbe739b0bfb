use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::{debug, info};
use userext_config::SmtpConfig;

use super::{MailError, Mailer};

/// Delivers mail through an SMTP relay
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<SmtpTransport, MailError> {
        let builder = if self.config.use_tls {
            SmtpTransport::starttls_relay(&self.config.host)
                .map_err(|e| MailError::Transport(format!("Failed to create SMTP transport: {e}")))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.host)
        };

        let mut builder = builder
            .port(self.config.port)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)));

        if let Some(username) = &self.config.username {
            let password = self.config.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(builder.build())
    }
}

pub(crate) fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn build_message(
    subject: &str,
    body: &str,
    from: &str,
    recipients: &[String],
) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(from)?)
        .subject(subject)
        .header(header::ContentType::TEXT_PLAIN);

    for recipient in recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .body(body.to_string())
        .map_err(|e| MailError::Message(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_mail(
        &self,
        subject: &str,
        body: &str,
        from: &str,
        recipients: &[String],
    ) -> Result<(), MailError> {
        debug!(host = %self.config.host, subject = %subject, "sending email");

        let message = build_message(subject, body, from, recipients)?;
        let transport = self.build_transport()?;

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || {
            transport
                .send(&message)
                .map_err(|e| MailError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| MailError::Transport(format!("Task join error: {e}")))??;

        info!(to = %recipients.join(", "), subject = %subject, "email sent");
        Ok(())
    }
}
