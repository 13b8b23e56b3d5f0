//! Mail delivery through an HTTP relay, or the log when no relay is configured.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::config::MailConfig;
use crate::domain::email::RenderedEmail;
use crate::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, rendered: RenderedEmail) -> Self {
        Self { to: to.into(), subject: rendered.subject, html: rendered.html, reply_to: None }
    }

    pub fn reply_to(mut self, address: impl Into<String>) -> Self { self.reply_to = Some(address.into()); self }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self { Self { client: reqwest::Client::new(), config } }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let mut req = self.client.post(&self.config.url).json(&json!({
            "from": self.config.from,
            "to": email.to,
            "subject": email.subject,
            "html": email.html,
            "reply_to": email.reply_to,
        }));
        if let Some(ref key) = self.config.api_key {
            req = req.bearer_auth(key.trim());
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(StoreError::Upstream(format!("Mail API Error: {}", res.status())));
        }
        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Development stand-in: logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, bytes = email.html.len(), "mail relay not configured, email logged only");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl RecordingMailer {
        pub(crate) fn sent(&self) -> Vec<OutgoingEmail> { self.sent.lock().unwrap().clone() }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<()> {
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_log_mailer_accepts() {
        let email = OutgoingEmail::new("a@b.org", RenderedEmail { subject: "s".into(), html: "<p>h</p>".into() });
        assert!(LogMailer.send(email).await.is_ok());
    }

    #[test]
    fn test_reply_to_serialization() {
        let email = OutgoingEmail::new("a@b.org", RenderedEmail { subject: "s".into(), html: "h".into() });
        assert!(serde_json::to_value(&email).unwrap().get("reply_to").is_none());
        let json = serde_json::to_value(email.reply_to("c@d.org")).unwrap();
        assert_eq!(json["reply_to"], "c@d.org");
    }
}
