//! A notifier that emails the report over SMTP.

use crate::config::{EmailConfig, SmtpSecurity};
use crate::core::{Notifier, RunReport};
use crate::formatting::TextFormatter;
use crate::notification::NotifyError;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox}, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, instrument};

pub struct EmailNotifier {
    config: EmailConfig,
    formatter: Box<dyn TextFormatter>,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig, formatter: Box<dyn TextFormatter>) -> Self {
        Self { config, formatter }
    }

    /// Builds the message sent by the configured account to the recipient.
    pub fn build_message(&self, report: &RunReport) -> Result<Message, NotifyError> {
        let from = self
            .config
            .username
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Email(format!("invalid sender {:?}: {e}", self.config.username)))?;
        let to = self
            .config
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Email(format!("invalid recipient {:?}: {e}", self.config.recipient)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&self.config.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(self.formatter.format_report(report))
            .map_err(|e| NotifyError::Email(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        let server = &self.config.server;
        let builder = match self.config.tls {
            SmtpSecurity::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
                .map_err(|e| NotifyError::Email(e.to_string()))?,
            SmtpSecurity::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(server)
                .map_err(|e| NotifyError::Email(e.to_string()))?,
            SmtpSecurity::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server),
        };
        Ok(builder.port(self.config.port).credentials(creds).build())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip_all, fields(recipient = %self.config.recipient))]
    async fn notify(&self, report: &RunReport) -> anyhow::Result<()> {
        let message = self.build_message(report)?;
        self.transport()?
            .send(message)
            .await
            .map_err(|e| NotifyError::Email(e.to_string()))?;
        info!("Data sent via email.");
        Ok(())
    }
}
