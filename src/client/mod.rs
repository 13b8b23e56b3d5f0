//! Browser-side controllers for the admin console and checkout, written
//! against a [`Transport`] so they run the same over reqwest or in tests.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::templates::EmailDraft;
use crate::domain::aggregates::{Order, OrderStatus, Product};
use crate::domain::checkout::{ContractRequest, LineRequest};
use crate::domain::email::EmailTemplate;
use crate::domain::pricing::PriceBreakdown;
use crate::domain::value_objects::Money;

pub mod checkout;
pub mod orders;

pub use checkout::CheckoutSession;
pub use orders::OrdersConsole;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Non-2xx answer; `message` is the body's `error` field when present.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel { Success, Error }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self { Self { level: ToastLevel::Success, message: message.into() } }
    pub fn error(message: impl Into<String>) -> Self { Self { level: ToastLevel::Error, message: message.into() } }
    pub fn is_error(&self) -> bool { self.level == ToastLevel::Error }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ClientError>;
}

pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), token: None }
    }

    /// Sends the admin JWT as the `auth_token` cookie, as a browser would.
    pub fn with_token(mut self, token: impl Into<String>) -> Self { self.token = Some(token.into()); self }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.http.request(method, &url);
        if let Some(ref token) = self.token {
            let cookie = cookie::Cookie::new(crate::auth::AUTH_COOKIE, token.as_str());
            req = req.header(reqwest::header::COOKIE, cookie.stripped().to_string());
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.map_err(|e| ClientError::Connection(e.to_string()))?;
        let status = res.status();
        let text = res.text().await.map_err(|e| ClientError::Connection(e.to_string()))?;
        let value = if text.trim().is_empty() { Value::Null } else { serde_json::from_str(&text).unwrap_or(Value::String(text)) };
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "request failed");
            return Err(ClientError::Status { status: status.as_u16(), message: error_message(&value, status.as_u16()) });
        }
        Ok(value)
    }
}

fn error_message(body: &Value, status: u16) -> String {
    body.get("error").and_then(Value::as_str).map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status))
}

fn decode<D: DeserializeOwned>(value: Value) -> Result<D, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::Deserialization(e.to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct SendTemplate {
    pub template: EmailTemplate,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse { totals: PriceBreakdown }

/// Typed calls over a [`Transport`]. Paths mirror [`crate::api::router`].
pub struct Api<T> {
    transport: T,
}

impl<T: Transport> Api<T> {
    pub fn new(transport: T) -> Self { Self { transport } }

    pub fn transport(&self) -> &T { &self.transport }

    pub async fn list_products(&self) -> Result<Vec<Product>, ClientError> {
        let page = self.transport.request(Method::GET, "/api/products?per_page=100", None).await?;
        decode(page.get("data").cloned().unwrap_or(Value::Null))
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, ClientError> {
        decode(self.transport.request(Method::GET, "/api/admin/orders", None).await?)
    }

    pub async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, ClientError> {
        let path = format!("/api/admin/orders/{}/status", id);
        decode(self.transport.request(Method::PATCH, &path, Some(json!({ "status": status }))).await?)
    }

    pub async fn delete_order(&self, id: i64) -> Result<(), ClientError> {
        self.transport.request(Method::DELETE, &format!("/api/admin/orders/{}", id), None).await?;
        Ok(())
    }

    pub async fn resend_email(&self, id: i64) -> Result<(), ClientError> {
        self.transport.request(Method::POST, &format!("/api/admin/orders/{}/resend-email", id), None).await?;
        Ok(())
    }

    pub async fn preview_template(&self, id: i64, template: EmailTemplate) -> Result<EmailDraft, ClientError> {
        let path = format!("/api/admin/orders/{}/preview-template?template={}", id, template.id());
        decode(self.transport.request(Method::GET, &path, None).await?)
    }

    pub async fn send_template(&self, id: i64, message: &SendTemplate) -> Result<(), ClientError> {
        let body = serde_json::to_value(message).map_err(|e| ClientError::Deserialization(e.to_string()))?;
        self.transport.request(Method::POST, &format!("/api/admin/orders/{}/send-template", id), Some(body)).await?;
        Ok(())
    }

    pub async fn generate_email(&self, order_id: i64, template: EmailTemplate, instructions: Option<&str>) -> Result<EmailDraft, ClientError> {
        let body = json!({ "order_id": order_id, "template": template, "instructions": instructions });
        decode(self.transport.request(Method::POST, "/api/admin/generate-email", Some(body)).await?)
    }

    pub async fn submit_contract(&self, req: &ContractRequest) -> Result<Order, ClientError> {
        let body = serde_json::to_value(req).map_err(|e| ClientError::Deserialization(e.to_string()))?;
        decode(self.transport.request(Method::POST, "/api/contracts", Some(body)).await?)
    }

    pub async fn generate_quote(&self, name: &str, email: &str, items: &[LineRequest], include_installation: bool) -> Result<PriceBreakdown, ClientError> {
        let body = json!({ "name": name, "email": email, "items": items, "include_installation": include_installation });
        let resp: QuoteResponse = decode(self.transport.request(Method::POST, "/api/generate-quote", Some(body)).await?)?;
        Ok(resp.totals)
    }

    pub async fn create_custom_service(&self, title: &str, description: &str, price: Money) -> Result<Product, ClientError> {
        let body = json!({ "title": title, "description": description, "price": price });
        decode(self.transport.request(Method::POST, "/api/custom-services", Some(body)).await?)
    }
}
