//! Order email actions for the admin console: resend, preview, send and AI compose.

use axum::{extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::domain::aggregates::Order;
use crate::domain::email::{self, EmailTemplate, RenderedEmail};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::services::OutgoingEmail;
use crate::{Result, StoreError};

async fn load(s: &AppState, id: i64) -> Result<Order> {
    s.repo.get_order(id).await?.ok_or(StoreError::OrderNotFound(id))
}

async fn deliver(s: &AppState, order: &Order, template: &str, rendered: RenderedEmail) -> Result<()> {
    let message = OutgoingEmail::new(&order.contact.email, rendered).reply_to(&s.config.business.email);
    s.mailer.send(message).await?;
    tracing::info!(order_id = order.id, template, "order email sent");
    s.events.publish(DomainEvent::Order(OrderEvent::EmailSent { order_id: order.id, template: template.to_string() })).await;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub template: String,
    pub subject: String,
    pub html: String,
    /// Sandboxed iframe wrapping `html`.
    pub preview: String,
}

impl EmailDraft {
    fn new(template: EmailTemplate, subject: String, html: String) -> Self {
        let preview = email::preview_document(&html);
        Self { template: template.id().to_string(), subject, html, preview }
    }
}

pub async fn resend_email(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    let order = load(&s, id).await?;
    deliver(&s, &order, "order_confirmation", email::order_confirmation(&order, &s.config.business)).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub template: String,
    pub instructions: Option<String>,
}

pub async fn preview_template(State(s): State<AppState>, Path(id): Path<i64>, Query(p): Query<PreviewParams>) -> Result<Json<EmailDraft>> {
    let template: EmailTemplate = p.template.parse()?;
    let order = load(&s, id).await?;
    let rendered = email::render(template, &order, p.instructions.as_deref(), &s.config.business)?;
    Ok(Json(EmailDraft::new(template, rendered.subject, rendered.html)))
}

#[derive(Debug, Deserialize)]
pub struct SendTemplateRequest {
    pub template: String,
    /// Edited copy from the composer; the built-in rendering is used when absent.
    pub subject: Option<String>,
    pub html: Option<String>,
    pub instructions: Option<String>,
}

pub async fn send_template(State(s): State<AppState>, Path(id): Path<i64>, Json(r): Json<SendTemplateRequest>) -> Result<Json<Value>> {
    let template: EmailTemplate = r.template.parse()?;
    let order = load(&s, id).await?;
    let edited = (
        r.subject.as_deref().map(str::trim).filter(|t| !t.is_empty()),
        r.html.as_deref().filter(|h| !h.trim().is_empty()),
    );
    let rendered = match edited {
        (Some(subject), Some(html)) => RenderedEmail { subject: subject.to_string(), html: html.to_string() },
        (None, None) => email::render(template, &order, r.instructions.as_deref(), &s.config.business)?,
        _ => return Err(StoreError::validation("Provide both subject and html, or neither")),
    };
    let subject = rendered.subject.clone();
    deliver(&s, &order, template.id(), rendered).await?;
    Ok(Json(json!({ "success": true, "subject": subject })))
}

#[derive(Debug, Deserialize)]
pub struct GenerateEmailRequest {
    pub order_id: i64,
    pub template: String,
    pub instructions: Option<String>,
}

/// Drafts with the AI backend when configured, otherwise with the built-in template.
pub async fn generate_email(State(s): State<AppState>, Json(r): Json<GenerateEmailRequest>) -> Result<Json<EmailDraft>> {
    let template: EmailTemplate = r.template.parse()?;
    let order = load(&s, r.order_id).await?;
    let instructions = r.instructions.as_deref();
    let draft = match s.ai.as_ref() {
        Some(ai) => {
            let prompt = email::prompt(template, &order, instructions, &s.config.business)?;
            let generated = ai.generate_email(&prompt).await?;
            EmailDraft::new(template, generated.subject, generated.html)
        }
        None => {
            let rendered = email::render(template, &order, instructions, &s.config.business)?;
            EmailDraft::new(template, rendered.subject, rendered.html)
        }
    };
    Ok(Json(draft))
}
