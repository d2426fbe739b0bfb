use async_trait::async_trait;
use tracing::info;

use super::{MailError, Mailer};

/// Writes outgoing mail to the log instead of delivering it
#[derive(Debug, Clone, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send_mail(
        &self,
        subject: &str,
        body: &str,
        from: &str,
        recipients: &[String],
    ) -> Result<(), MailError> {
        info!(
            from = %from,
            to = %recipients.join(", "),
            subject = %subject,
            body = %body,
            "console mail"
        );
        Ok(())
    }
}
