//! Delivery of the finished report to external channels.
//!
//! Each channel implements [`Notifier`](crate::core::Notifier). The
//! application builds the enabled notifiers from configuration and hands
//! every one of them the same report.
pub mod email;
pub mod webhook;

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

use crate::config::Config;
use crate::core::Notifier;
use crate::formatting::PlainTextFormatter;
use anyhow::Result;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("webhook extra data is not valid JSON: {0}")]
    InvalidExtraData(#[from] serde_json::Error),

    #[error("webhook extra data must be a JSON object, got {0}")]
    ExtraDataNotObject(String),

    #[error("email delivery failed: {0}")]
    Email(String),
}

/// Builds the notifiers switched on in the output configuration.
pub fn build_notifiers(config: &Config) -> Result<Vec<Box<dyn Notifier>>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if config.output.send_webhook {
        if let Some(webhook) = &config.output.webhook {
            info!(url = %webhook.url, "Webhook notification enabled.");
            notifiers.push(Box::new(WebhookNotifier::new(
                webhook.clone(),
                Box::new(PlainTextFormatter),
            )?));
        }
    }

    if config.output.send_email {
        if let Some(email) = &config.output.email {
            info!(server = %email.server, "Email notification enabled.");
            notifiers.push(Box::new(EmailNotifier::new(
                email.clone(),
                Box::new(PlainTextFormatter),
            )));
        }
    }

    Ok(notifiers)
}
