//! A notifier that posts the report to a generic JSON webhook
//! (Slack, Mattermost, Teams, ...).

use crate::config::WebhookConfig;
use crate::core::{Notifier, RunReport};
use crate::formatting::{adapt_for_webhook, TextFormatter};
use crate::notification::NotifyError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{error, info, instrument};

/// Builds the webhook body: `{text_field: message}` merged with the entries
/// of `extra_data`, a JSON object in which single quotes may stand in for
/// double quotes. `extra_data` wins on key collisions.
pub fn prepare_payload(
    message: &str,
    text_field: &str,
    extra_data: Option<&str>,
) -> Result<Value, NotifyError> {
    let mut payload = Map::new();
    payload.insert(text_field.to_string(), Value::String(message.to_string()));

    if let Some(extra) = extra_data.filter(|s| !s.trim().is_empty()) {
        let normalized = extra.replace('\'', "\"");
        match serde_json::from_str::<Value>(&normalized)? {
            Value::Object(fields) => payload.extend(fields),
            other => return Err(NotifyError::ExtraDataNotObject(other.to_string())),
        }
    }

    Ok(Value::Object(payload))
}

/// Posts reports to a webhook URL.
pub struct WebhookNotifier {
    config: WebhookConfig,
    formatter: Box<dyn TextFormatter>,
    http: reqwest::Client,
}

impl WebhookNotifier {
    /// Creates a new `WebhookNotifier`.
    pub fn new(config: WebhookConfig, formatter: Box<dyn TextFormatter>) -> Result<Self, NotifyError> {
        Self::with_timeout(config, formatter, Duration::from_secs(10))
    }

    pub fn with_timeout(
        config: WebhookConfig,
        formatter: Box<dyn TextFormatter>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            config,
            formatter,
            http,
        })
    }

    async fn send_request(&self, payload: &Value) -> Result<(), NotifyError> {
        let response = self.http.post(&self.config.url).json(payload).send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Webhook rejected the report");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    #[instrument(skip_all)]
    async fn notify(&self, report: &RunReport) -> anyhow::Result<()> {
        let message = self.formatter.format_report(report);
        let message = adapt_for_webhook(&message, &self.config.url);
        let payload = prepare_payload(
            &message,
            &self.config.text_field,
            self.config.extra_data.as_deref(),
        )?;

        self.send_request(&payload).await?;
        info!("Data sent to webhook.");
        Ok(())
    }
}
