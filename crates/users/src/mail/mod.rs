//! Outbound mail delivery.
//!
//! Verification emails go through the [`Mailer`] trait so the services never
//! talk to an SMTP server directly. [`SmtpMailer`] relays through lettre,
//! [`ConsoleMailer`] only logs the message.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use userext_config::{MailBackend, MailConfig};

mod console;
mod smtp;

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// Sends a plain-text email
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(
        &self,
        subject: &str,
        body: &str,
        from: &str,
        recipients: &[String],
    ) -> Result<(), MailError>;
}

/// Build the mailer selected by the configuration
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match config.backend {
        MailBackend::Console => Arc::new(ConsoleMailer),
        MailBackend::Smtp => Arc::new(SmtpMailer::new(config.smtp.clone())),
    }
}
