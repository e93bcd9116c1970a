// src/services/notifier.rs

//! Notification delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::MailConfig;

/// Delivers one message to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()>;
}

/// Outcome of sending a digest to every recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

/// Send the same message to each recipient in turn.
///
/// A failure for one recipient is logged and does not stop the others.
pub async fn deliver_all(
    notifier: &dyn Notifier,
    subject: &str,
    body: &str,
    recipients: &[String],
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for recipient in recipients {
        match notifier.send(subject, body, recipient).await {
            Ok(()) => {
                log::info!("Email sent to {}", recipient);
                report.sent.push(recipient.clone());
            }
            Err(e) => {
                log::error!("Failed to send email to {}: {}", recipient, e);
                report.failed.push(recipient.clone());
            }
        }
    }
    report
}

#[derive(Serialize)]
struct Sender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MailPayload<'a> {
    sender: Sender<'a>,
    to: Vec<Recipient<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

/// Sends HTML mail through a transactional email HTTP API.
pub struct HttpMailer {
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: String,
    client: Client,
}

impl HttpMailer {
    pub fn new(config: &MailConfig, api_key: impl Into<String>, client: Client) -> Self {
        Self {
            api_url: config.api_url.clone(),
            api_key: api_key.into(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
            client,
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()> {
        let payload = MailPayload {
            sender: Sender {
                name: &self.sender_name,
                email: &self.sender_email,
            },
            to: vec![Recipient { email: to }],
            subject,
            html_content: body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".to_string());
            Err(AppError::notify(format!("mail API error: {status} - {text}")))
        }
    }
}

/// Logs messages instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()> {
        log::info!("[dry run] '{}' to {} ({} bytes)", subject, to, body.len());
        log::debug!("{}", body);
        Ok(())
    }
}

/// Pick the notifier for a mail config: HTTP when an API key is set.
pub fn from_config(config: &MailConfig, client: Client) -> Box<dyn Notifier> {
    match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Box::new(HttpMailer::new(config, key, client)),
        _ => {
            log::warn!("No mail API key configured; digests will only be logged");
            Box::new(LogNotifier)
        }
    }
}
