use async_trait::async_trait;

/// Magic-link delivery seam
///
/// Actual email delivery is an external collaborator; the application
/// only hands over the recipient and the finished sign-in URL. The dev
/// configuration uses `LogMailer` and additionally surfaces the link in
/// the API response instead of sending mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_magic_link(&self, email: &str, link: &str) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Development mailer: writes the sign-in link to the log
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_magic_link(&self, email: &str, link: &str) -> Result<(), MailerError> {
        tracing::info!(email = %email, link = %link, "magic link issued (dev mailer, not sent)");
        Ok(())
    }
}
