//! REST surface. Every handler re-derives prices from the catalog; figures
//! sent by the browser are only compared, never stored.

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::auth;
use crate::config::AppConfig;
use crate::repository::Repository;
use crate::services::{ContentGenerator, EventBus, Mailer};

pub mod error;
pub mod orders;
pub mod products;
pub mod storefront;
pub mod templates;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub events: EventBus,
    pub mailer: Arc<dyn Mailer>,
    /// `None` when no AI endpoint is configured.
    pub ai: Option<Arc<dyn ContentGenerator>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn ai(&self) -> crate::Result<&Arc<dyn ContentGenerator>> {
        self.ai.as_ref().ok_or(crate::StoreError::NotConfigured("AI content generation"))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "sanctuary-av"})) }))
        // storefront
        .route("/api/products", get(products::list_public))
        .route("/api/products/:id", get(products::get_public))
        .route("/api/orders", post(orders::create_order))
        .route("/api/contracts", post(orders::create_contract))
        .route("/api/custom-services", post(products::create_custom_service))
        .route("/api/generate-quote", post(storefront::generate_quote))
        .route("/api/contact", post(storefront::contact))
        // back office
        .route("/api/admin/login", post(auth::login))
        .route("/api/admin/logout", post(auth::logout))
        .route("/api/admin/products", get(products::list_admin).post(products::create_product))
        .route("/api/admin/products/:id", put(products::update_product).delete(products::delete_product))
        .route("/api/admin/enhance-service", post(products::enhance_service))
        .route("/api/admin/orders", get(orders::list_orders))
        .route("/api/admin/orders/stats", get(orders::order_stats))
        .route("/api/admin/orders/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/api/admin/orders/:id/status", patch(orders::update_status))
        .route("/api/admin/orders/:id/resend-email", post(templates::resend_email))
        .route("/api/admin/orders/:id/preview-template", get(templates::preview_template))
        .route("/api/admin/orders/:id/send-template", post(templates::send_template))
        .route("/api/admin/generate-email", post(templates::generate_email))
        .route("/admin/login", get(auth::login_page))
        .route("/admin", get(auth::dashboard_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth::admin_gate))
        .with_state(state)
}
