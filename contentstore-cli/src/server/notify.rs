use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contentstore_lib::Notification;
use thiserror::Error;

use super::config::{FormsConfig, NotifierKind};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned status {0}")]
    Status(u16),
    #[error("notifier is not configured: {0}")]
    Misconfigured(&'static str),
}

/// Delivers one notification per accepted form submission.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them.
pub struct LogNotifier {
    recipient: String,
}

impl LogNotifier {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            form = %notification.form,
            to = %self.recipient,
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}

/// Posts the notification as JSON to a mail relay or chat webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    recipient: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, token: Option<String>, recipient: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: url.into(),
            token,
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "to": self.recipient,
            "subject": notification.subject,
            "text": notification.body,
            "form": notification.form,
            "fields": notification.fields,
        });
        let mut req = self.client.post(&self.url).json(&payload);
        if let Some(ref t) = self.token {
            req = req.header("Authorization", format!("Bearer {}", t));
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Build the notifier selected in the forms configuration.
pub fn build_notifier(config: &FormsConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.notifier {
        NotifierKind::Log => Ok(Arc::new(LogNotifier::new(config.recipient.clone()))),
        NotifierKind::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .filter(|u| !u.trim().is_empty())
                .ok_or(NotifyError::Misconfigured("webhook_url is required"))?;
            Ok(Arc::new(WebhookNotifier::new(
                url,
                config.webhook_token.clone().filter(|t| !t.is_empty()),
                config.recipient.clone(),
            )))
        }
    }
}
