//! Mail sender backed by a JSON-over-HTTP transactional mail API.
//!
//! The payload follows the common `{from, to, subject, text, attachments}`
//! shape with base64 attachment content and bearer-token auth.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::debug;

use crate::app::ports::MailSenderPort;
use crate::config::Secret;
use crate::domain::MailMessage;
use crate::error::{RelayError, Result};

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    attachments: Vec<AttachmentPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload<'a> {
    filename: &'a str,
    content: String,
}

pub struct HttpMailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: Secret,
}

impl HttpMailSender {
    pub fn new(api_url: impl Into<String>, api_key: Secret) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl MailSenderPort for HttpMailSender {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let bytes = tokio::fs::read(&message.attachment.path).await?;
        debug!(
            path = %message.attachment.path.display(),
            bytes = bytes.len(),
            "Loaded attachment"
        );

        let body = SendRequest {
            from: &message.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            text: &message.text,
            attachments: vec![AttachmentPayload {
                filename: &message.attachment.filename,
                content: STANDARD.encode(&bytes),
            }],
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RelayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
