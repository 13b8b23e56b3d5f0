//! Sanctuary AV - storefront and back-office for church audio/visual
//!
//! ## Features
//! - Product catalog with service/custom-service tax treatment
//! - Bundle pricing (7.75% sales tax on goods, services and installation exempt)
//! - Multi-step checkout with e-signed contracts
//! - Admin order management, reporting and templated / AI-assisted email
//! - JWT cookie gate in front of the admin surface

use thiserror::Error;

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod domain;
pub mod repository;
pub mod services;

use domain::aggregates::{BundleError, OrderError};
use domain::checkout::FieldErrors;
use domain::email::EmailError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("{message}")]
    Validation { message: String, details: Option<serde_json::Value> },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation { message: message.into(), details: None }
    }

    pub fn fields(errors: FieldErrors) -> Self {
        StoreError::Validation { message: "Please correct the highlighted fields".into(), details: serde_json::to_value(errors).ok() }
    }
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        StoreError::Validation { message: "Invalid request".into(), details: serde_json::to_value(&errors).ok() }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self { StoreError::Upstream(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, StoreError>;
