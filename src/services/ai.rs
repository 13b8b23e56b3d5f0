//! AI-assisted copy: email drafts for the order console and service descriptions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AiConfig;
use crate::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedEmail {
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Runs a prompt that asks for `{"subject", "html"}` JSON.
    async fn generate_email(&self, prompt: &str) -> Result<GeneratedEmail>;
    async fn enhance_description(&self, title: &str, description: &str) -> Result<String>;
}

/// Talks to a text-generation endpoint that accepts `{model, prompt}` and
/// answers `{"text": ...}`.
pub struct HttpContentGenerator {
    client: reqwest::Client,
    config: AiConfig,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

impl HttpContentGenerator {
    pub fn new(config: AiConfig) -> Self { Self { client: reqwest::Client::new(), config } }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut req = self.client.post(&self.config.url).json(&json!({ "model": self.config.model, "prompt": prompt }));
        if let Some(ref key) = self.config.api_key {
            req = req.bearer_auth(key.trim());
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(StoreError::Upstream(format!("AI API Error: {}", res.status())));
        }
        let body: CompletionResponse = res.json().await?;
        Ok(body.text)
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate_email(&self, prompt: &str) -> Result<GeneratedEmail> {
        let text = self.complete(prompt).await?;
        parse_generated_email(&text)
    }

    async fn enhance_description(&self, title: &str, description: &str) -> Result<String> {
        let text = self.complete(&enhance_prompt(title, description)).await?;
        let text = strip_fences(&text).trim().to_string();
        if text.is_empty() { return Err(StoreError::Upstream("AI returned an empty description".into())); }
        Ok(text)
    }
}

pub fn enhance_prompt(title: &str, description: &str) -> String {
    format!(
        "Rewrite the description of a church audio/video service called \"{title}\" so it is clear, warm and professional. \
         Keep it under 120 words, plain text only, no headings.\n\nCurrent description: {description}"
    )
}

fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    let t = t.strip_prefix("```json").or_else(|| t.strip_prefix("```")).unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}

/// Models often wrap JSON in prose or code fences; take the outermost object.
pub fn parse_generated_email(text: &str) -> Result<GeneratedEmail> {
    let body = strip_fences(text);
    let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
        return Err(StoreError::Upstream("AI response did not contain JSON".into()));
    };
    if end < start { return Err(StoreError::Upstream("AI response did not contain JSON".into())); }
    let email: GeneratedEmail = serde_json::from_str(&body[start..=end])
        .map_err(|e| StoreError::Upstream(format!("Malformed AI response: {}", e)))?;
    if email.subject.trim().is_empty() || email.html.trim().is_empty() {
        return Err(StoreError::Upstream("AI response is missing subject or html".into()));
    }
    Ok(email)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Echoes prompts back so tests can assert on what was asked.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        pub prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate_email(&self, prompt: &str) -> Result<GeneratedEmail> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(GeneratedEmail { subject: "Drafted".into(), html: "<p>Hello from the team</p>".into() })
        }

        async fn enhance_description(&self, title: &str, _description: &str) -> Result<String> {
            Ok(format!("{title}, done right."))
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let email = parse_generated_email(r#"{"subject":"Hi","html":"<p>x</p>"}"#).unwrap();
        assert_eq!(email.subject, "Hi");
    }

    #[test]
    fn test_parse_fenced_with_prose() {
        let text = "```json\nSure! {\"subject\": \"Reminder\", \"html\": \"<p>Pay</p>\"}\n```";
        assert_eq!(parse_generated_email(text).unwrap().html, "<p>Pay</p>");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_generated_email("no json here"), Err(StoreError::Upstream(_))));
        assert!(parse_generated_email(r#"{"subject":"","html":"<p>x</p>"}"#).is_err());
    }

    #[test]
    fn test_enhance_prompt_mentions_title() {
        assert!(enhance_prompt("Choir miking", "we mic choirs").contains("\"Choir miking\""));
    }
}
