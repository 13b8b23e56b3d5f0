//! Public storefront actions that only send mail: priced quotes and the contact form.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::orders::price_lines;
use crate::api::AppState;
use crate::domain::checkout::LineRequest;
use crate::domain::email::{self, QuoteLine};
use crate::domain::pricing::PriceBreakdown;
use crate::services::OutgoingEmail;
use crate::Result;

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Add at least one item"))]
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub include_installation: bool,
    #[validate(length(max = 5000))]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub success: bool,
    pub totals: PriceBreakdown,
}

pub async fn generate_quote(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> Result<Json<QuoteResponse>> {
    r.validate()?;
    let bundle = price_lines(&s, &r.items, r.include_installation).await?;
    let lines: Vec<QuoteLine> = bundle.items().iter()
        .map(|i| QuoteLine { title: i.product.title.clone(), quantity: i.quantity, unit_price: i.unit_price() })
        .collect();
    let totals = bundle.pricing();
    let rendered = email::quote_email(r.name.trim(), &lines, &totals, r.message.as_deref(), &s.config.business);
    s.mailer.send(OutgoingEmail::new(r.email.trim(), rendered).reply_to(&s.config.business.email)).await?;
    tracing::info!(email = %r.email, total = %totals.total, items = lines.len(), "quote sent");
    Ok(Json(QuoteResponse { success: true, totals }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    pub phone: Option<String>,
    pub topic: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Message is required"))]
    pub message: String,
}

pub async fn contact(State(s): State<AppState>, Json(r): Json<ContactRequest>) -> Result<Json<serde_json::Value>> {
    r.validate()?;
    let phone = r.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let topic = r.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let rendered = email::contact_notification(r.name.trim(), r.email.trim(), phone, topic, r.message.trim(), &s.config.business);
    s.mailer.send(OutgoingEmail::new(&s.config.business_inbox, rendered).reply_to(r.email.trim())).await?;
    tracing::info!(from = %r.email, "contact message relayed");
    Ok(Json(serde_json::json!({ "success": true })))
}
